use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking paid for out-of-band by an attendant at the gate.
pub const PAYMENT_MANUAL: &str = "MANUAL";
/// Booking whose gateway transaction has not completed yet.
pub const PAYMENT_PENDING: &str = "PENDING";

/// Returns true for payment ids that are lifecycle markers rather than
/// gateway transaction ids. Marker bookings are exempt from the
/// duplicate-transaction probe.
pub fn is_payment_marker(payment_id: &str) -> bool {
    payment_id == PAYMENT_MANUAL || payment_id == PAYMENT_PENDING
}

/// A physical parking location with fixed capacity. `booked_slot` is the
/// only shared mutable counter in the system and is written exclusively by
/// the slot ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingLot {
    pub id: Uuid,
    pub location: String,
    pub total_slot: i32,
    pub booked_slot: i32,
    pub price_per_hour: i32,
    pub admin_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vehicle category label ("Car", "Bike", ...). Deleted only while no
/// vehicle references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub label: String,
}

/// The commercial record linking a user to a lot for one vehicle.
/// Immutable after creation except for the payment id back-fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub parking_lot_id: Uuid,
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
}

/// Occupancy status of a vehicle record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleStatus {
    /// Reserved (future) or currently parked.
    In,
    /// Past its reservation window, awaiting settlement. Slot still booked.
    Out,
    /// Settled, terminal.
    Done,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::In => "IN",
            VehicleStatus::Out => "OUT",
            VehicleStatus::Done => "DONE",
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(VehicleStatus::In),
            "OUT" => Ok(VehicleStatus::Out),
            "DONE" => Ok(VehicleStatus::Done),
            other => Err(format!("unknown vehicle status: {other}")),
        }
    }
}

/// The occupancy record with its own state machine, 1:1 with its booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub category_id: Uuid,
    pub company: String,
    pub registration: String,
    pub in_time: DateTime<Utc>,
    pub out_time: Option<DateTime<Utc>>,
    pub status: VehicleStatus,
    pub remark: Option<String>,
}

/// Vehicle fields supplied by the caller at booking time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub category_id: Uuid,
    pub company: String,
    pub registration: String,
    pub in_time: DateTime<Utc>,
}

/// Validated input to the booking transaction engine. Both entry points
/// (attendant walk-in and payment webhook) build this same struct.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: String,
    pub parking_lot_id: Uuid,
    pub payment_id: String,
    pub vehicle: VehicleDetails,
}

/// Result of a successful (or idempotently replayed) booking creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub vehicle: Vehicle,
}
