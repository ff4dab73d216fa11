//! Versioned secret storage across one or more backend vaults.
//!
//! # Architecture
//!
//! - [`identifier`]: the opaque `(name, version)` identifier codec
//! - [`backends`]: the [`VaultConnection`] contract and its implementations
//! - [`store`]: the [`SecretStore`] contract and the single-backend [`VaultStore`]
//! - [`redirect`]: the [`RedirectStore`] router and the [`build_store`] factory
//!
//! # Example
//!
//! ```rust,ignore
//! use bosh_vault::secrets::{build_store, DefaultConnector};
//!
//! let store = build_store(&config, &DefaultConnector, MetricsRecorder::new()).await?;
//! let id = store.set("/director/db_password", json!("hunter2")).await?;
//! let versions = store.get_all_by_name("/director/db_password").await?;
//! ```

pub mod backends;
pub mod error;
pub mod identifier;
pub mod redirect;
pub mod store;
pub mod types;

pub use backends::{
    BackendKind, DefaultConnector, InMemoryVault, SharedConnection, UnavailableConnection,
    VaultConfig, VaultConnection, VaultConnector, VaultKv2Connection,
};
pub use error::{Result, SecretsError};
pub use identifier::{decode, encode, SecretIdentifier, VersionedSecretName, LATEST_VERSION};
pub use redirect::{build_store, RedirectRule, RedirectStore, Route};
pub use store::{SecretStore, VaultStore};
pub use types::{Secret, SecretString, SecretVersionMetadata, VersionIndex};
