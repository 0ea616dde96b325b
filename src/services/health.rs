//! Health service - endpoint di stato del server e del database

use crate::core::{AppError, AppState};
use crate::dtos::ApiResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Root endpoint - health check
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}

/// Verifica che il database risponda a una query banale
#[instrument(skip(state))]
pub async fn database_health(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Value>>, AppError> {
    debug!("Checking database health");
    let one: i64 = sqlx::query_scalar("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|e| {
            warn!("Database health check failed: {}", e);
            AppError::service_unavailable("Database unavailable")
        })?;

    Ok(Json(ApiResponse::success(json!({ "database": one == 1 }))))
}
