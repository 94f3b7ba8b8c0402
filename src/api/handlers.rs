use crate::core::broker::ServiceBroker;
use crate::domain::model::{
    BindResponse, Catalog, DeleteParams, DeprovisionResponse, ErrorResponse, ProvisionResponse,
    UnbindResponse,
};
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::{BrokerError, ValidationError};
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use std::sync::Arc;

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            description: self.client_description(),
        };
        (status, Json(body)).into_response()
    }
}

/// 空白 body 與無法解析的 JSON 是兩種不同的 400
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::EmptyBody);
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejecting request body: {}", e);
        ValidationError::MalformedBody
    })
}

/// 記錄每個請求與對應的回應狀態
pub async fn log_exchange(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    tracing::info!("📥 {} {} (user agent: {})", method, uri, user_agent);
    let response = next.run(request).await;

    let status = response.status();
    if status.is_server_error() {
        tracing::warn!("📤 {} {} -> {}", method, uri, status);
    } else {
        tracing::info!("📤 {} {} -> {}", method, uri, status);
    }
    response
}

pub async fn catalog<R: ContainerRuntime>(
    State(broker): State<Arc<ServiceBroker<R>>>,
) -> Json<Catalog> {
    Json(broker.catalog())
}

pub async fn provision<R: ContainerRuntime>(
    State(broker): State<Arc<ServiceBroker<R>>>,
    Path(instance_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProvisionResponse>), BrokerError> {
    let body = decode_body(&body)?;
    let response = broker.provision(&instance_id, &body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn bind<R: ContainerRuntime>(
    State(broker): State<Arc<ServiceBroker<R>>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<BindResponse>), BrokerError> {
    let body = decode_body(&body)?;
    let response = broker.bind(&instance_id, &binding_id, &body)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn unbind<R: ContainerRuntime>(
    State(broker): State<Arc<ServiceBroker<R>>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<UnbindResponse>, BrokerError> {
    Ok(Json(broker.unbind(&instance_id, &binding_id, &params)?))
}

pub async fn deprovision<R: ContainerRuntime>(
    State(broker): State<Arc<ServiceBroker<R>>>,
    Path(instance_id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeprovisionResponse>, BrokerError> {
    Ok(Json(broker.deprovision(&instance_id, &params).await?))
}
