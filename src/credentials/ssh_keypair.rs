//! SSH keypairs: PEM private key, OpenSSH `ssh-rsa` public key and its SHA256 fingerprint.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::rsa_keypair::{
    default_key_length, generate_private_key, private_key_pem, PERMITTED_KEY_LENGTHS,
};
use super::{CredentialGenerator, CredentialRecord, CredentialType};
use crate::secrets::{Result, SecretStore};

const KEY_TYPE: &str = "ssh-rsa";

/// RFC 4253 public key blob: string "ssh-rsa", mpint e, mpint n.
fn public_key_blob(key: &RsaPublicKey) -> Vec<u8> {
    let mut blob = Vec::new();
    write_string(&mut blob, KEY_TYPE.as_bytes());
    write_mpint(&mut blob, &key.e().to_bytes_be());
    write_mpint(&mut blob, &key.n().to_bytes_be());
    blob
}

fn write_string(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

fn write_mpint(buf: &mut Vec<u8>, magnitude: &[u8]) {
    let start = magnitude.iter().position(|&b| b != 0).unwrap_or(magnitude.len());
    let trimmed = &magnitude[start..];
    // positive values with the high bit set need a leading zero byte
    if trimmed.first().is_some_and(|b| b & 0x80 != 0) {
        let mut padded = Vec::with_capacity(trimmed.len() + 1);
        padded.push(0);
        padded.extend_from_slice(trimmed);
        write_string(buf, &padded);
    } else {
        write_string(buf, trimmed);
    }
}

/// `ssh-rsa AAAA...` authorized_keys line, without a comment.
pub fn openssh_public_key(key: &RsaPublicKey) -> String {
    format!("{} {}", KEY_TYPE, STANDARD.encode(public_key_blob(key)))
}

/// `SHA256:<base64>` fingerprint as printed by `ssh-keygen -l`.
pub fn fingerprint(key: &RsaPublicKey) -> String {
    let digest = Sha256::digest(public_key_blob(key));
    format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyParameters {
    #[serde(default = "default_key_length")]
    pub key_length: usize,
}

#[async_trait]
impl CredentialGenerator for SshKeyParameters {
    fn credential_type(&self) -> CredentialType {
        CredentialType::SshKeypair
    }

    fn validate(&self) -> bool {
        PERMITTED_KEY_LENGTHS.contains(&self.key_length)
    }

    async fn generate(&self, _store: &dyn SecretStore) -> Result<Box<dyn CredentialRecord>> {
        let ty = self.credential_type();
        let key = generate_private_key(ty, self.key_length).await?;
        let public = key.to_public_key();

        Ok(Box::new(SshKeyRecord {
            private_key: private_key_pem(ty, &key)?,
            public_key: openssh_public_key(&public),
            public_key_fingerprint: fingerprint(&public),
        }))
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyRecord {
    pub private_key: String,
    pub public_key: String,
    #[serde(default)]
    pub public_key_fingerprint: String,
}

impl std::fmt::Debug for SshKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshKeyRecord")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("public_key_fingerprint", &self.public_key_fingerprint)
            .finish()
    }
}

#[async_trait]
impl CredentialRecord for SshKeyRecord {
    fn credential_type(&self) -> CredentialType {
        CredentialType::SshKeypair
    }

    fn validate(&self) -> bool {
        !self.private_key.is_empty() && !self.public_key.is_empty()
    }

    fn to_value(&self) -> Value {
        serde_json::json!({
            "private_key": self.private_key,
            "public_key": self.public_key,
            "public_key_fingerprint": self.public_key_fingerprint,
        })
    }
}
