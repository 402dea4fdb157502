use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use parkline_core::models::{Category, ParkingLot};
use parkline_core::EngineError;

use crate::{error::ApiError, middleware::auth::AdminClaims, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateLotRequest {
    pub location: String,
    pub total_slot: i32,
    pub price_per_hour: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub label: String,
}

// ============================================================================
// Lot Management Handlers
// ============================================================================

/// POST /v1/admin/lots
pub async fn create_lot(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Json(req): Json<CreateLotRequest>,
) -> Result<Json<ParkingLot>, ApiError> {
    let lot = state
        .lots
        .create_lot(&req.location, req.total_slot, req.price_per_hour, &claims.sub)
        .await?;

    Ok(Json(lot))
}

/// GET /v1/admin/lots
pub async fn list_lots(State(state): State<AppState>) -> Result<Json<Vec<ParkingLot>>, ApiError> {
    let lots = state.lots.list_lots().await?;
    Ok(Json(lots))
}

/// GET /v1/admin/lots/{id}
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> Result<Json<ParkingLot>, ApiError> {
    let lot = state
        .lots
        .get_lot(lot_id)
        .await?
        .ok_or(EngineError::LotNotFound(lot_id))?;

    Ok(Json(lot))
}

/// DELETE /v1/admin/lots/{id}
/// Rejected while any booking still references the lot.
pub async fn delete_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.lots.delete_lot(lot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Category Management Handlers
// ============================================================================

/// POST /v1/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = state.lots.create_category(&req.label).await?;
    Ok(Json(category))
}

/// GET /v1/admin/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.lots.list_categories().await?;
    Ok(Json(categories))
}

/// DELETE /v1/admin/categories/{id}
/// Rejected while any vehicle still references the category.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.lots.delete_category(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
