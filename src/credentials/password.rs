//! Random passwords.

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CredentialGenerator, CredentialRecord, CredentialType};
use crate::secrets::{Result, SecretStore, SecretsError};

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const NUMBERS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

pub const DEFAULT_LENGTH: usize = 30;
pub const MIN_LENGTH: usize = 4;
pub const MAX_LENGTH: usize = 256;

fn default_length() -> usize {
    DEFAULT_LENGTH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordParameters {
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub exclude_upper: bool,
    #[serde(default)]
    pub exclude_lower: bool,
    #[serde(default)]
    pub exclude_number: bool,
    #[serde(default)]
    pub include_special: bool,
}

impl Default for PasswordParameters {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            exclude_upper: false,
            exclude_lower: false,
            exclude_number: false,
            include_special: false,
        }
    }
}

impl PasswordParameters {
    fn charsets(&self) -> Vec<&'static [u8]> {
        let mut sets = Vec::with_capacity(4);
        if !self.exclude_upper {
            sets.push(UPPER);
        }
        if !self.exclude_lower {
            sets.push(LOWER);
        }
        if !self.exclude_number {
            sets.push(NUMBERS);
        }
        if self.include_special {
            sets.push(SPECIAL);
        }
        sets
    }

    /// One character from every enabled class, the rest from their union, shuffled.
    fn generate_password(&self) -> Result<String> {
        if !self.validate() {
            return Err(SecretsError::validation_failed(CredentialType::Password.as_str()));
        }
        let sets = self.charsets();
        let alphabet: Vec<u8> = sets.iter().flat_map(|set| set.iter().copied()).collect();
        let mut rng = OsRng;

        let mut password: Vec<u8> = sets.iter().map(|set| set[rng.gen_range(0..set.len())]).collect();
        while password.len() < self.length {
            password.push(alphabet[rng.gen_range(0..alphabet.len())]);
        }
        password.shuffle(&mut rng);

        Ok(password.into_iter().map(char::from).collect())
    }
}

#[async_trait]
impl CredentialGenerator for PasswordParameters {
    fn credential_type(&self) -> CredentialType {
        CredentialType::Password
    }

    fn validate(&self) -> bool {
        let classes = self.charsets().len();
        classes > 0 && (MIN_LENGTH..=MAX_LENGTH).contains(&self.length) && self.length >= classes
    }

    async fn generate(&self, _store: &dyn SecretStore) -> Result<Box<dyn CredentialRecord>> {
        Ok(Box::new(PasswordRecord(self.generate_password()?)))
    }
}

/// A password, stored as a bare JSON string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordRecord(pub String);

impl std::fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordRecord([REDACTED])")
    }
}

#[async_trait]
impl CredentialRecord for PasswordRecord {
    fn credential_type(&self) -> CredentialType {
        CredentialType::Password
    }

    fn validate(&self) -> bool {
        !self.0.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}
