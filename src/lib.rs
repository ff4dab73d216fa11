//! # bosh-vault
//!
//! A BOSH config-server compatible credential broker. Credentials are generated or
//! accepted over a small REST API and stored as versioned secrets in HashiCorp Vault,
//! optionally spread across several Vault servers by name-based redirect rules.
//!
//! ## Architecture
//!
//! ```text
//! REST API (axum) → Credential Dispatcher → Redirect Router → Vault Store → Vault KV v2
//!                          ↓                                        ↓
//!                 Credential Variants                      Identifier Codec
//! ```
//!
//! ## Core Components
//!
//! - **secrets**: identifier codec, backend connections, single-backend store, redirect router
//! - **credentials**: two-phase request parsing and the password, ssh-keypair,
//!   rsa-keypair and certificate variants
//! - **api**: `/v1/data` and `/v1/health` handlers and the HTTP(S) listener
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bosh_vault::{api, config, observability, secrets, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = config::load_config(None)?;
//!     let metrics = observability::init_observability(&config.observability)?;
//!     let store = secrets::build_store(&config, &secrets::DefaultConnector, metrics).await?;
//!     api::start_api_server(&config.server, api::ApiState::new(store, metrics)).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod observability;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
