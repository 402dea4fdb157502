use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use parkline_core::EngineError;

#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    AuthenticationError(String),
    AuthorizationError(String),
    /// Payment was captured but the lot filled up before the booking could
    /// be created. No slot is held while a payment is pending, so this
    /// window is real and must be reported honestly to the payer.
    SlotTakenAfterPayment,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg),
            ApiError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::SlotTakenAfterPayment => (
                StatusCode::CONFLICT,
                "BOOKING_FAILED_SLOT_TAKEN",
                "payment confirmed but the lot filled up before a slot could be reserved".to_string(),
            ),
            ApiError::Engine(err) => match err {
                EngineError::LotNotFound(_)
                | EngineError::CategoryNotFound(_)
                | EngineError::VehicleNotFound(_)
                | EngineError::BookingNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                EngineError::NoAvailableSlots(_) => {
                    (StatusCode::CONFLICT, "FULLY_BOOKED", err.to_string())
                }
                EngineError::TokenExpired
                | EngineError::TokenMalformed
                | EngineError::TokenSignatureMismatch => {
                    tracing::warn!("rejected payment intent token: {}", err);
                    (StatusCode::UNAUTHORIZED, "INVALID_INTENT_TOKEN", err.to_string())
                }
                EngineError::PaymentVerificationFailed => {
                    tracing::warn!("gateway payment verification failed");
                    (StatusCode::BAD_REQUEST, "PAYMENT_VERIFICATION_FAILED", err.to_string())
                }
                EngineError::InvalidStateTransition { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION", err.to_string())
                }
                EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION", msg),
                EngineError::SlotUnderflow(_) | EngineError::Storage(_) => {
                    tracing::error!("Internal Server Error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL",
                        "Internal Server Error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
