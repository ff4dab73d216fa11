//! Integration tests for multi-backend routing and the startup failure policy.

mod common;

use axum::http::{Method, StatusCode};
use bosh_vault::config::AppConfig;
use bosh_vault::observability::MetricsRecorder;
use bosh_vault::secrets::{
    build_store, decode, encode, InMemoryVault, SecretStore, SecretsError, VersionedSecretName,
};
use serde_json::{json, Value};

use common::{
    read_json, redirect_config, router_for, send, store_for, vault_config, FakeConnector,
    DEFAULT_ADDRESS, REDIRECT_ADDRESS,
};

#[tokio::test]
async fn set_routes_by_rule() {
    let a = InMemoryVault::new();
    let b = InMemoryVault::new();
    let connector =
        FakeConnector::default().with(DEFAULT_ADDRESS, a.clone()).with(REDIRECT_ADDRESS, b.clone());
    let store = store_for(&redirect_config(&[("foo", "bar")]), &connector).await;

    let redirected = store.set("foo", json!("v")).await.unwrap();
    store.set("baz", json!("v")).await.unwrap();

    assert!(b.contains("bar").await);
    assert!(!a.contains("foo").await);
    assert!(!b.contains("foo").await);
    assert!(a.contains("baz").await);
    assert!(!b.contains("baz").await);

    // identifiers carry the public name
    assert_eq!(decode(&redirected).unwrap(), VersionedSecretName::new("foo", 1));
    let secret = store.get_by_id(&redirected).await.unwrap();
    assert_eq!(secret.name, "foo");
    assert_eq!(secret.value, json!("v"));
}

#[tokio::test]
async fn listing_a_redirected_name_uses_public_identifiers() {
    let a = InMemoryVault::new();
    let b = InMemoryVault::new();
    let connector =
        FakeConnector::default().with(DEFAULT_ADDRESS, a).with(REDIRECT_ADDRESS, b.clone());
    let store = store_for(&redirect_config(&[("/cf/admin", "/shared/admin")]), &connector).await;

    let app = router_for(store);
    for value in ["first", "second"] {
        let body = json!({"name": "/cf/admin", "type": "password", "value": value}).to_string();
        assert_eq!(send(&app, Method::PUT, "/v1/data", Some(&body)).await.status(), StatusCode::OK);
    }
    assert_eq!(b.version_count("/shared/admin").await, 2);

    let listed: Value =
        read_json(send(&app, Method::GET, "/v1/data?name=/cf/admin", None).await).await;
    let data = listed["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["name"], "/cf/admin");
    assert_eq!(data[0]["value"], "second");
    assert_eq!(data[0]["id"], encode(&VersionedSecretName::new("/cf/admin", 2)).as_str());
}

#[tokio::test]
async fn empty_redirect_keeps_the_public_name() {
    let a = InMemoryVault::new();
    let b = InMemoryVault::new();
    let connector =
        FakeConnector::default().with(DEFAULT_ADDRESS, a.clone()).with(REDIRECT_ADDRESS, b.clone());
    let store = store_for(&redirect_config(&[("/same", "")]), &connector).await;

    store.set("/same", json!(1)).await.unwrap();
    assert!(b.contains("/same").await);
    assert!(!a.contains("/same").await);
}

#[tokio::test]
async fn unreachable_default_backend_is_fatal() {
    let connector = FakeConnector::default().with(REDIRECT_ADDRESS, InMemoryVault::new());
    let config = redirect_config(&[("foo", "bar")]);

    let err = build_store(&config, &connector, MetricsRecorder::new()).await.unwrap_err();
    assert!(matches!(err, SecretsError::BackendUnavailable { .. }));

    let single = AppConfig { vault: vault_config(DEFAULT_ADDRESS), ..Default::default() };
    let err = build_store(&single, &FakeConnector::default(), MetricsRecorder::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SecretsError::BackendUnavailable { .. }));
}

#[tokio::test]
async fn unreachable_redirect_backend_degrades_only_its_names() {
    let a = InMemoryVault::new();
    let connector = FakeConnector::default().with(DEFAULT_ADDRESS, a.clone());
    let store = store_for(&redirect_config(&[("foo", "bar")]), &connector).await;

    let err = store.set("foo", json!("v")).await.unwrap_err();
    assert!(matches!(err, SecretsError::BackendUnavailable { .. }));
    let err = store.get_all_by_name("foo").await.unwrap_err();
    assert!(matches!(err, SecretsError::BackendUnavailable { .. }));

    store.set("baz", json!("v")).await.unwrap();
    assert!(a.contains("baz").await);
    assert!(store.healthy().await);

    let app = router_for(store);
    let response = send(&app, Method::GET, "/v1/data?name=foo", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "backend_unavailable");

    let response = send(&app, Method::GET, "/v1/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn no_overwrite_through_a_redirect_is_idempotent() {
    let b = InMemoryVault::new();
    let connector = FakeConnector::default()
        .with(DEFAULT_ADDRESS, InMemoryVault::new())
        .with(REDIRECT_ADDRESS, b.clone());
    let app = router_for(store_for(&redirect_config(&[("/k", "/other/k")]), &connector).await);

    let body = r#"{"name":"/k","type":"password","mode":"no-overwrite"}"#;
    let first: Value = read_json(send(&app, Method::POST, "/v1/data", Some(body)).await).await;
    let second: Value = read_json(send(&app, Method::POST, "/v1/data", Some(body)).await).await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["name"], "/k");
    assert_eq!(b.version_count("/other/k").await, 1);
}
