//! Data carried between the store, the backends and clients.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::identifier::SecretIdentifier;

/// One version of a secret as returned to clients.
///
/// Never carries backend identity: `name` is always the public name the client used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub id: SecretIdentifier,
    pub name: String,
    pub value: Value,
}

/// Backend-reported state of a single version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretVersionMetadata {
    pub version_number: u64,
    pub destroyed: bool,
}

/// Version index for one name, keyed by version number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionIndex {
    versions: BTreeMap<u64, SecretVersionMetadata>,
}

impl VersionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, version_number: u64, destroyed: bool) {
        self.versions.insert(version_number, SecretVersionMetadata { version_number, destroyed });
    }

    /// Number of indexed versions. Versions are dense and 1-indexed, so this is also
    /// the newest version number.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn get(&self, version_number: u64) -> Option<&SecretVersionMetadata> {
        self.versions.get(&version_number)
    }

    /// A version missing from the index is treated as destroyed.
    pub fn is_destroyed(&self, version_number: u64) -> bool {
        self.get(version_number).map_or(true, |meta| meta.destroyed)
    }
}

impl FromIterator<SecretVersionMetadata> for VersionIndex {
    fn from_iter<I: IntoIterator<Item = SecretVersionMetadata>>(iter: I) -> Self {
        let mut index = Self::new();
        for meta in iter {
            index.insert(meta.version_number, meta.destroyed);
        }
        index
    }
}

/// A string that never shows up in logs, debug output or serialized config.
///
/// Used for backend tokens. The buffer is zeroed on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw value. Only call this where the value is actually consumed.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
