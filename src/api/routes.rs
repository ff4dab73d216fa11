use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::credentials::CredentialService;
use crate::observability::MetricsRecorder;
use crate::secrets::SecretStore;

use super::handlers::{
    delete_by_name_handler, generate_handler, get_by_id_handler, health_handler,
    list_by_name_handler, set_handler,
};

#[derive(Debug, Clone)]
pub struct ApiState {
    pub store: Arc<dyn SecretStore>,
    pub credentials: CredentialService,
}

impl ApiState {
    pub fn new(store: Arc<dyn SecretStore>, metrics: MetricsRecorder) -> Self {
        Self { credentials: CredentialService::with_metrics(store.clone(), metrics), store }
    }
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/v1/data",
            get(list_by_name_handler)
                .post(generate_handler)
                .put(set_handler)
                .delete(delete_by_name_handler),
        )
        .route("/v1/data/{id}", get(get_by_id_handler))
        .route("/v1/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
