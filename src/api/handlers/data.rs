//! `/v1/data` handlers: read, generate, set and delete secrets.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, Instrument};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::credentials::CredentialResponse;
use crate::request_span;
use crate::secrets::{Secret, SecretIdentifier};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: Option<String>,
}

impl NameQuery {
    fn require(self) -> Result<String, ApiError> {
        match self.name {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ApiError::bad_request("missing required query parameter: name")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretList {
    pub data: Vec<Secret>,
}

/// `GET /v1/data?name=` lists every live version, newest first.
pub async fn list_by_name_handler(
    State(state): State<ApiState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<SecretList>, ApiError> {
    let name = query.require()?;
    let data = state
        .store
        .get_all_by_name(&name)
        .instrument(request_span!("GET", "/v1/data", name = %name))
        .await?;
    Ok(Json(SecretList { data }))
}

/// `GET /v1/data/{id}`
pub async fn get_by_id_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Secret>, ApiError> {
    let id = SecretIdentifier::from_raw(id);
    let secret =
        state.store.get_by_id(&id).instrument(request_span!("GET", "/v1/data/{id}")).await?;
    Ok(Json(secret))
}

/// `POST /v1/data` generates a credential.
///
/// The body is taken as raw bytes so malformed JSON surfaces as a parse error
/// from the dispatcher rather than an extractor rejection.
pub async fn generate_handler(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CredentialResponse>), ApiError> {
    let response =
        state.credentials.generate(&body).instrument(request_span!("POST", "/v1/data")).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `PUT /v1/data` stores client-supplied material.
pub async fn set_handler(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<CredentialResponse>, ApiError> {
    let response = state.credentials.set(&body).instrument(request_span!("PUT", "/v1/data")).await?;
    Ok(Json(response))
}

/// `DELETE /v1/data?name=`
pub async fn delete_by_name_handler(
    State(state): State<ApiState>,
    Query(query): Query<NameQuery>,
) -> Result<StatusCode, ApiError> {
    let name = query.require()?;
    state
        .store
        .delete_by_name(&name)
        .instrument(request_span!("DELETE", "/v1/data", name = %name))
        .await?;
    info!(name = %name, "Deleted secret");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_query_requires_value() {
        assert!(NameQuery { name: None }.require().is_err());
        assert!(NameQuery { name: Some(String::new()) }.require().is_err());
        assert_eq!(NameQuery { name: Some("/a".into()) }.require().unwrap(), "/a");
    }
}
