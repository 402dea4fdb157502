use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parkline_core::models::{CreatedBooking, NewBooking, Vehicle, VehicleDetails, PAYMENT_MANUAL};
use parkline_core::EngineError;

use crate::{error::ApiError, middleware::auth::AdminClaims, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub parking_lot_id: Uuid,
    pub category_id: Uuid,
    pub company: String,
    pub registration: String,
    pub in_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VehicleListQuery {
    pub lot_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub remark: String,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub transitioned: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/bookings
/// Walk-in booking entered by an attendant. Goes through the same atomic
/// routine as the gateway path; there is no fast path around the slot check.
pub async fn create_manual_booking(
    State(state): State<AppState>,
    Extension(_claims): Extension<AdminClaims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<CreatedBooking>, ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(EngineError::validation("user_id must not be empty").into());
    }
    if req.registration.trim().is_empty() {
        return Err(EngineError::validation("registration must not be empty").into());
    }
    if req.company.trim().is_empty() {
        return Err(EngineError::validation("company must not be empty").into());
    }

    let new_booking = NewBooking {
        user_id: req.user_id,
        parking_lot_id: req.parking_lot_id,
        payment_id: PAYMENT_MANUAL.to_string(),
        vehicle: VehicleDetails {
            category_id: req.category_id,
            company: req.company,
            registration: req.registration,
            in_time: req.in_time,
        },
    };

    let created = state.bookings.create_booking(&new_booking).await?;
    Ok(Json(created))
}

/// GET /v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CreatedBooking>, ApiError> {
    let found = state
        .bookings
        .get_booking(booking_id)
        .await?
        .ok_or(EngineError::BookingNotFound(booking_id))?;

    Ok(Json(found))
}

/// GET /v1/vehicles/upcoming?lot_id=
/// Future reservations: IN vehicles whose in-time has not arrived yet.
pub async fn upcoming_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let vehicles = state.vehicles.upcoming(query.lot_id).await?;
    Ok(Json(vehicles))
}

/// GET /v1/vehicles/due?lot_id=
/// Vehicles needing attention: overdue INs the sweep has not reached yet
/// and OUTs awaiting settlement.
pub async fn due_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let vehicles = state.vehicles.due(query.lot_id).await?;
    Ok(Json(vehicles))
}

/// POST /v1/vehicles/{id}/settle
pub async fn settle_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<Vehicle>, ApiError> {
    if req.remark.trim().is_empty() {
        return Err(EngineError::validation("settlement requires a non-empty remark").into());
    }

    let vehicle = state.vehicles.settle(vehicle_id, &req.remark).await?;
    Ok(Json(vehicle))
}

/// POST /v1/vehicles/sweep
/// Explicit trigger for the IN -> OUT sweep; the scheduled worker runs the
/// same operation.
pub async fn sweep_vehicles(
    State(state): State<AppState>,
) -> Result<Json<SweepResponse>, ApiError> {
    let transitioned = state.vehicles.sweep_due_vehicles().await?;
    Ok(Json(SweepResponse { transitioned }))
}
