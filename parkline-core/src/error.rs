use uuid::Uuid;

use crate::models::VehicleStatus;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Parking lot not found: {0}")]
    LotNotFound(Uuid),

    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("No available slots in lot {0}")]
    NoAvailableSlots(Uuid),

    #[error("Payment intent token expired")]
    TokenExpired,

    #[error("Payment intent token malformed")]
    TokenMalformed,

    #[error("Payment intent token signature mismatch")]
    TokenSignatureMismatch,

    #[error("Gateway payment verification failed")]
    PaymentVerificationFailed,

    #[error("Invalid vehicle transition from {from} to {to}")]
    InvalidStateTransition {
        from: VehicleStatus,
        to: VehicleStatus,
    },

    #[error("Slot counter underflow for lot {0}")]
    SlotUnderflow(Uuid),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Wrap a storage-layer failure. The enclosing transaction has already
    /// rolled back by the time this surfaces.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
