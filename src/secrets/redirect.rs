//! Redirect router over multiple backend vaults.
//!
//! A [`RedirectStore`] owns one [`VaultStore`] per backend and an ordered rule table.
//! Every operation first resolves the public name to a `(backend, stored name)` pair;
//! the first rule whose `ref` equals the name wins, otherwise the default backend is
//! used with the name unchanged.
//!
//! Clients only ever see public names. Identifiers are re-encoded with the stored
//! name on the way in and with the public name on the way out.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use super::backends::{SharedConnection, UnavailableConnection, VaultConnector};
use super::error::Result;
use super::identifier::{decode, encode, SecretIdentifier, VersionedSecretName};
use super::store::{SecretStore, VaultStore};
use super::types::Secret;
use crate::config::{AppConfig, RedirectRuleConfig};
use crate::observability::MetricsRecorder;

/// Index of the default backend in the router's backend list.
const DEFAULT_BACKEND: usize = 0;

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    /// Public name matched exactly
    pub reference: String,
    /// Name used on the target backend
    pub redirect_to: String,
    /// Stable index into the router's backend list
    pub backend: usize,
}

/// Resolved routing decision for one public name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub backend: usize,
    pub stored_name: &'a str,
}

/// Multi-backend store. Immutable after construction.
#[derive(Debug)]
pub struct RedirectStore {
    backends: Vec<VaultStore>,
    rules: Vec<RedirectRule>,
}

impl RedirectStore {
    /// Build a router from an already-complete backend list.
    ///
    /// Backend index `0` is `default`; `redirects[i]` is index `i + 1`. Rules pointing
    /// at any other index are dropped with an error log.
    pub fn new(default: VaultStore, redirects: Vec<VaultStore>, rules: Vec<RedirectRule>) -> Self {
        let mut backends = Vec::with_capacity(redirects.len() + 1);
        backends.push(default);
        backends.extend(redirects);

        let backend_count = backends.len();
        let rules = rules
            .into_iter()
            .filter(|rule| {
                let valid = rule.backend < backend_count;
                if !valid {
                    error!(reference = %rule.reference, backend = rule.backend, "Dropping redirect rule with unknown backend");
                }
                valid
            })
            .collect();
        Self { backends, rules }
    }

    pub fn rules(&self) -> &[RedirectRule] {
        &self.rules
    }

    pub fn backend(&self, index: usize) -> Option<&VaultStore> {
        self.backends.get(index)
    }

    /// First matching rule in table order, or the default backend.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Route<'a> {
        self.rules
            .iter()
            .find(|rule| rule.reference == name)
            .map(|rule| Route { backend: rule.backend, stored_name: rule.redirect_to.as_str() })
            .unwrap_or(Route { backend: DEFAULT_BACKEND, stored_name: name })
    }

    fn store_for(&self, route: Route<'_>) -> &VaultStore {
        &self.backends[route.backend]
    }

    /// Rewrite a backend-side secret so it only mentions the public name.
    fn to_public(public_name: &str, secret: Secret) -> Result<Secret> {
        let stored = decode(&secret.id)?;
        Ok(Secret {
            id: encode(&stored.renamed(public_name)),
            name: public_name.to_string(),
            value: secret.value,
        })
    }
}

#[async_trait]
impl SecretStore for RedirectStore {
    async fn get_by_id(&self, id: &SecretIdentifier) -> Result<Secret> {
        let public = decode(id)?;
        let route = self.resolve(&public.name);
        let stored_id = encode(&public.renamed(route.stored_name));

        let secret = self.store_for(route).get_by_id(&stored_id).await?;
        Ok(Secret { id: id.clone(), name: public.name, value: secret.value })
    }

    async fn get_all_by_name(&self, name: &str) -> Result<Vec<Secret>> {
        let route = self.resolve(name);
        self.store_for(route)
            .get_all_by_name(route.stored_name)
            .await?
            .into_iter()
            .map(|secret| Self::to_public(name, secret))
            .collect()
    }

    async fn get_newest_by_name(&self, name: &str) -> Result<Secret> {
        let route = self.resolve(name);
        let secret = self.store_for(route).get_newest_by_name(route.stored_name).await?;
        Self::to_public(name, secret)
    }

    async fn delete_by_name(&self, name: &str) -> Result<()> {
        let route = self.resolve(name);
        self.store_for(route).delete_by_name(route.stored_name).await
    }

    async fn set(&self, name: &str, value: Value) -> Result<SecretIdentifier> {
        let route = self.resolve(name);
        let stored_id = self.store_for(route).set(route.stored_name, value).await?;
        let stored = decode(&stored_id)?;
        Ok(encode(&stored.renamed(name)))
    }

    /// Health of the default backend. Redirect backends only affect their own names.
    async fn healthy(&self) -> bool {
        self.backends[DEFAULT_BACKEND].healthy().await
    }
}

/// Connect every configured backend and assemble the store.
///
/// The default backend must connect; its failure is returned and must stop startup.
/// A redirect backend that fails to connect is logged and replaced with an
/// [`UnavailableConnection`], so only the names routed to it fail.
pub async fn build_store(
    config: &AppConfig,
    connector: &dyn VaultConnector,
    metrics: MetricsRecorder,
) -> Result<Arc<dyn SecretStore>> {
    let default_connection = connector.connect(&config.vault).await.map_err(|e| {
        error!(address = %config.vault.address, error = %e, "Default backend connection failed");
        e
    })?;
    info!(backend = %default_connection.describe(), "Default backend connected");

    if config.redirects.is_empty() {
        return Ok(Arc::new(VaultStore::with_metrics(default_connection, metrics)));
    }

    // Every backend is connected before any rule refers to one.
    let default = VaultStore::with_metrics(default_connection, metrics);
    let mut redirects = Vec::with_capacity(config.redirects.len());

    let mut rules = Vec::with_capacity(config.redirect_rule_count());
    for group in &config.redirects {
        let connection: SharedConnection = match connector.connect(&group.vault).await {
            Ok(connection) => {
                info!(backend = %connection.describe(), rules = group.rules.len(), "Redirect backend connected");
                connection
            }
            Err(e) => {
                error!(
                    address = %group.vault.address,
                    error = %e,
                    rules = group.rules.len(),
                    "Redirect backend connection failed, routed names will be unavailable"
                );
                Arc::new(UnavailableConnection::new(&group.vault.address, e.to_string()))
            }
        };

        redirects.push(VaultStore::with_metrics(connection, metrics));
        let index = redirects.len();
        rules.extend(group.rules.iter().map(|rule| rule_for(rule, index)));
    }

    Ok(Arc::new(RedirectStore::new(default, redirects, rules)))
}

fn rule_for(config: &RedirectRuleConfig, backend: usize) -> RedirectRule {
    RedirectRule {
        reference: config.reference.clone(),
        redirect_to: config.target_name().to_string(),
        backend,
    }
}
