//! # REST API
//!
//! BOSH config-server compatible HTTP surface over the secret store and the
//! credential dispatcher.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
