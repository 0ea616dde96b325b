//! Item services - CRUD e paginazione degli item tramite il repository generico
//!
//! Ogni handler apre una sessione, usa il repository e fa commit solo se
//! tutte le operazioni vanno a buon fine.

use crate::core::{AppError, AppState, require_scope};
use crate::dtos::{ApiResponse, CreateItemDTO, ItemDTO, MaybeSet, PageQuery, UpdateItemDTO};
use crate::entities::Item;
use crate::services::jwt::Claims;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Scope richiesto per le operazioni di scrittura
pub const WRITE_SCOPE: &str = "items:write";

/// Body di PATCH /items/{id}: l'id arriva dal path
#[derive(Deserialize, Debug, Default)]
pub struct PatchItemBody {
    #[serde(default)]
    pub name: MaybeSet<String>,
    #[serde(default)]
    pub order: MaybeSet<i64>,
}

/// Query parameters di DELETE /items/{id}
#[derive(Deserialize, Debug, Default)]
pub struct DeleteItemQuery {
    /// Default: soft delete
    pub soft: Option<bool>,
}

#[instrument(skip(state, claims, params), fields(sub = %claims.sub))]
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<ItemDTO>>>, AppError> {
    debug!("Listing items");
    params.validate()?;
    let options = params.into_options()?;

    let mut session = state.sessions.begin().await?;
    let records = state.repository::<Item>(&mut session).query(options).await?;
    session.commit().await?;

    info!("Returned {} items", records.records.len());
    Ok(Json(ApiResponse::from(records)))
}

#[instrument(skip(state, claims), fields(sub = %claims.sub))]
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<String>,
) -> Result<Json<ApiResponse<ItemDTO>>, AppError> {
    debug!("Fetching item");
    let mut session = state.sessions.begin().await?;
    let item = state.repository::<Item>(&mut session).lookup(&item_id, true).await?;
    session.commit().await?;

    Ok(Json(ApiResponse::success(item)))
}

#[instrument(skip(state, claims, body), fields(sub = %claims.sub))]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateItemDTO>,
) -> Result<(StatusCode, Json<ApiResponse<ItemDTO>>), AppError> {
    debug!("Creating item");
    require_scope(&claims, &[WRITE_SCOPE])?;
    body.validate()?;

    let mut session = state.sessions.begin().await?;
    let item = state.repository::<Item>(&mut session).create_one(&body).await?;
    session.commit().await?;

    info!(item_id = %item.base.id, "Item created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

#[instrument(skip(state, claims, body), fields(sub = %claims.sub))]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<String>,
    Json(body): Json<PatchItemBody>,
) -> Result<Json<ApiResponse<ItemDTO>>, AppError> {
    debug!("Updating item");
    require_scope(&claims, &[WRITE_SCOPE])?;
    let dto = UpdateItemDTO {
        id: item_id,
        name: body.name,
        order: body.order,
    };
    dto.validate()?;

    let mut session = state.sessions.begin().await?;
    let item = {
        let mut repository = state.repository::<Item>(&mut session);
        // un item soft-deleted non è aggiornabile via API
        repository.lookup(&dto.id, true).await?;
        repository.update_one(&dto).await?;
        repository.lookup(&dto.id, true).await?
    };
    session.commit().await?;

    info!(item_id = %item.base.id, "Item updated");
    Ok(Json(ApiResponse::success(item)))
}

#[instrument(skip(state, claims, params), fields(sub = %claims.sub))]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<String>,
    Query(params): Query<DeleteItemQuery>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    debug!("Deleting item");
    require_scope(&claims, &[WRITE_SCOPE])?;
    let soft = params.soft.unwrap_or(true);

    let mut session = state.sessions.begin().await?;
    let deleted = state.repository::<Item>(&mut session).delete_one(&item_id, soft).await?;
    if deleted == 0 {
        warn!("Item not found or already deleted");
        return Err(AppError::not_found("Item not found"));
    }
    session.commit().await?;

    info!(soft, "Item deleted");
    Ok(Json(ApiResponse::success(json!({ "id": item_id, "soft": soft }))))
}
