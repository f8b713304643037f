//! Meta procedure handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use beacon_api_models::{ConfigResponse, MetaMethod, StatusResponse, Void};
use tracing::warn;

use crate::http::errors::ApiError;
use crate::http::router::ApiState;

pub(crate) async fn meta_status(
    State(state): State<Arc<ApiState>>,
    Json(_request): Json<Void>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.meta.status().await.map(Json).map_err(|err| {
        warn!(error = %err, method = %MetaMethod::Status, "meta source failed");
        ApiError::service_unavailable("server status is currently unavailable")
    })
}

pub(crate) async fn meta_config(
    State(state): State<Arc<ApiState>>,
    Json(_request): Json<Void>,
) -> Result<Json<ConfigResponse>, ApiError> {
    state.meta.config().await.map(Json).map_err(|err| {
        warn!(error = %err, method = %MetaMethod::Config, "meta source failed");
        ApiError::internal("failed to load server configuration")
    })
}
