//! Common test utilities for all integration tests.
//!
//! Builds routers and stores over in-memory vaults, and a connector that can be
//! told which backend addresses are unreachable.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response},
    Router,
};
use bosh_vault::{
    api::{build_router, ApiState},
    config::{AppConfig, RedirectGroupConfig, RedirectRuleConfig},
    observability::MetricsRecorder,
    secrets::{
        build_store, InMemoryVault, SecretStore, SecretsError, SharedConnection, VaultConfig,
        VaultConnector, VaultStore,
    },
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

pub const DEFAULT_ADDRESS: &str = "http://vault-a:8200";
pub const REDIRECT_ADDRESS: &str = "http://vault-b:8200";

/// Hands out pre-built in-memory vaults by address. Unknown addresses fail to connect.
#[derive(Debug, Default, Clone)]
pub struct FakeConnector {
    vaults: HashMap<String, InMemoryVault>,
}

impl FakeConnector {
    pub fn with(mut self, address: &str, vault: InMemoryVault) -> Self {
        self.vaults.insert(address.to_string(), vault);
        self
    }
}

#[async_trait]
impl VaultConnector for FakeConnector {
    async fn connect(&self, config: &VaultConfig) -> bosh_vault::secrets::Result<SharedConnection> {
        match self.vaults.get(&config.address) {
            Some(vault) => Ok(Arc::new(vault.clone())),
            None => Err(SecretsError::backend_unavailable(
                config.address.clone(),
                "connection refused",
            )),
        }
    }
}

pub fn vault_config(address: &str) -> VaultConfig {
    VaultConfig { address: address.to_string(), ..Default::default() }
}

/// Config with the default backend at [`DEFAULT_ADDRESS`] and one redirect group
/// at [`REDIRECT_ADDRESS`] holding `rules`.
pub fn redirect_config(rules: &[(&str, &str)]) -> AppConfig {
    AppConfig {
        vault: vault_config(DEFAULT_ADDRESS),
        redirects: vec![RedirectGroupConfig {
            vault: vault_config(REDIRECT_ADDRESS),
            rules: rules.iter().map(|(r, to)| RedirectRuleConfig::new(*r, *to)).collect(),
        }],
        ..Default::default()
    }
}

pub async fn store_for(config: &AppConfig, connector: &FakeConnector) -> Arc<dyn SecretStore> {
    build_store(config, connector, MetricsRecorder::new()).await.expect("build store")
}

pub fn router_for(store: Arc<dyn SecretStore>) -> Router {
    build_router(ApiState::new(store, MetricsRecorder::new()))
}

/// Router over a single fresh in-memory vault.
pub fn memory_app() -> (InMemoryVault, Router) {
    let vault = InMemoryVault::new();
    let store: Arc<dyn SecretStore> = Arc::new(VaultStore::new(Arc::new(vault.clone())));
    (vault, router_for(store))
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    router.clone().oneshot(request).await.expect("request")
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes =
        to_bytes(response.into_body(), usize::MAX).await.expect("read response body as bytes");
    serde_json::from_slice(&bytes).expect("parse json response")
}
