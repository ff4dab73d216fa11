//! X.509 certificates, either self-signed or signed by a CA already held in the store.
//!
//! Keys are ECDSA P-256. A signing CA is read with `get_latest_by_name(ca)` and must
//! have been stored in the certificate record shape.

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
    PKCS_ECDSA_P256_SHA256,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::{CredentialGenerator, CredentialRecord, CredentialType};
use crate::secrets::{Result, SecretStore, SecretsError};

pub const DEFAULT_DURATION_DAYS: u32 = 365;
pub const MAX_DURATION_DAYS: u32 = 3650;

fn default_duration() -> u32 {
    DEFAULT_DURATION_DAYS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendedKeyUsage {
    ServerAuth,
    ClientAuth,
}

impl From<ExtendedKeyUsage> for ExtendedKeyUsagePurpose {
    fn from(usage: ExtendedKeyUsage) -> Self {
        match usage {
            ExtendedKeyUsage::ServerAuth => Self::ServerAuth,
            ExtendedKeyUsage::ClientAuth => Self::ClientAuth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateParameters {
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub alternative_names: Vec<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub is_ca: bool,
    #[serde(default)]
    pub self_sign: bool,
    /// Name of the signing CA secret
    #[serde(default)]
    pub ca: Option<String>,
    #[serde(default)]
    pub extended_key_usage: Vec<ExtendedKeyUsage>,
    /// Validity in days
    #[serde(default = "default_duration")]
    pub duration: u32,
}

impl CertificateParameters {
    fn signing_ca(&self) -> Option<&str> {
        self.ca.as_deref().filter(|ca| !ca.is_empty())
    }

    /// A CA without a signer is a self-signed root.
    fn is_self_signed(&self) -> bool {
        self.self_sign || (self.is_ca && self.signing_ca().is_none())
    }

    fn error(&self, message: impl std::fmt::Display) -> SecretsError {
        SecretsError::generation(CredentialType::Certificate.as_str(), message.to_string())
    }

    fn build_params(&self) -> Result<CertificateParams> {
        let mut params =
            CertificateParams::new(self.alternative_names.clone()).map_err(|e| self.error(e))?;

        let mut subject = DistinguishedName::new();
        if !self.common_name.is_empty() {
            subject.push(DnType::CommonName, self.common_name.as_str());
        }
        if let Some(organization) = self.organization.as_deref() {
            subject.push(DnType::OrganizationName, organization);
        }
        params.distinguished_name = subject;

        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + Duration::days(i64::from(self.duration));

        let mut serial = [0u8; 16];
        OsRng.fill_bytes(&mut serial);
        serial[0] &= 0x7f;
        params.serial_number = Some(SerialNumber::from_slice(&serial));

        if self.is_ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
            params.key_usages = vec![
                KeyUsagePurpose::KeyCertSign,
                KeyUsagePurpose::CrlSign,
                KeyUsagePurpose::DigitalSignature,
            ];
        } else {
            params.is_ca = IsCa::ExplicitNoCa;
            params.key_usages =
                vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyEncipherment];
        }
        params.extended_key_usages =
            self.extended_key_usage.iter().copied().map(Into::into).collect();
        params.use_authority_key_identifier_extension = !self.is_self_signed();

        Ok(params)
    }

    /// Load the signing CA's certificate and key from the store.
    async fn load_ca(
        &self,
        store: &dyn SecretStore,
        ca_name: &str,
    ) -> Result<(CertificateRecord, Certificate, KeyPair)> {
        let secret = store.get_latest_by_name(ca_name).await.map_err(|e| {
            if e.is_not_found() {
                self.error(format!("CA '{}' not found", ca_name))
            } else {
                e
            }
        })?;

        let record: CertificateRecord = serde_json::from_value(secret.value)
            .map_err(|e| self.error(format!("CA '{}' is not a certificate: {}", ca_name, e)))?;

        let ca_key = KeyPair::from_pem(&record.private_key)
            .map_err(|e| self.error(format!("CA '{}' private key: {}", ca_name, e)))?;
        let ca_cert = CertificateParams::from_ca_cert_pem(&record.certificate)
            .and_then(|params| params.self_signed(&ca_key))
            .map_err(|e| self.error(format!("CA '{}' certificate: {}", ca_name, e)))?;

        Ok((record, ca_cert, ca_key))
    }
}

#[async_trait]
impl CredentialGenerator for CertificateParameters {
    fn credential_type(&self) -> CredentialType {
        CredentialType::Certificate
    }

    fn validate(&self) -> bool {
        let has_subject = !self.common_name.is_empty()
            || self.alternative_names.iter().any(|name| !name.is_empty());
        let one_signer = self.is_self_signed() != self.signing_ca().is_some();
        let duration_ok = (1..=MAX_DURATION_DAYS).contains(&self.duration);

        has_subject && one_signer && duration_ok
    }

    async fn generate(&self, store: &dyn SecretStore) -> Result<Box<dyn CredentialRecord>> {
        let params = self.build_params()?;
        let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).map_err(|e| self.error(e))?;

        let record = match self.signing_ca() {
            Some(ca_name) if !self.is_self_signed() => {
                let (ca_record, ca_cert, ca_key) = self.load_ca(store, ca_name).await?;
                let cert = params.signed_by(&key, &ca_cert, &ca_key).map_err(|e| self.error(e))?;
                debug!(ca = %ca_name, common_name = %self.common_name, "Issued CA-signed certificate");
                CertificateRecord {
                    ca: ca_record.certificate,
                    certificate: cert.pem(),
                    private_key: key.serialize_pem(),
                }
            }
            _ => {
                let cert = params.self_signed(&key).map_err(|e| self.error(e))?;
                debug!(common_name = %self.common_name, is_ca = self.is_ca, "Issued self-signed certificate");
                let pem = cert.pem();
                CertificateRecord { ca: pem.clone(), certificate: pem, private_key: key.serialize_pem() }
            }
        };

        Ok(Box::new(record))
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    #[serde(default)]
    pub ca: String,
    pub certificate: String,
    pub private_key: String,
}

impl std::fmt::Debug for CertificateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateRecord")
            .field("ca", &self.ca)
            .field("certificate", &self.certificate)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CredentialRecord for CertificateRecord {
    fn credential_type(&self) -> CredentialType {
        CredentialType::Certificate
    }

    fn validate(&self) -> bool {
        !self.certificate.is_empty() && !self.private_key.is_empty()
    }

    fn to_value(&self) -> Value {
        serde_json::json!({
            "ca": self.ca,
            "certificate": self.certificate,
            "private_key": self.private_key,
        })
    }
}
