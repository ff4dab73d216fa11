//! Backend vault connections.
//!
//! - **Vault**: HashiCorp Vault KV v2 engine over HTTP(S)
//! - **In-memory**: versioned process-local map, selected with a `memory://` address
//! - **Unavailable**: placeholder for a redirect backend that failed to connect

pub mod backend;
pub mod memory;
pub mod unavailable;
pub mod vault;

pub use backend::{BackendKind, DefaultConnector, SharedConnection, VaultConnection, VaultConnector};
pub use memory::InMemoryVault;
pub use unavailable::UnavailableConnection;
pub use vault::{VaultConfig, VaultKv2Connection, MEMORY_ADDRESS_SCHEME};
