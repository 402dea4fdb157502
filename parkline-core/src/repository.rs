use async_trait::async_trait;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{Category, CreatedBooking, NewBooking, ParkingLot, Vehicle};

/// The only path by which a Booking + Vehicle pair is ever created.
#[async_trait]
pub trait BookingEngine: Send + Sync {
    /// Reserve a slot and persist the booking and its vehicle as one atomic
    /// operation. Replaying a gateway transaction id returns the existing
    /// booking instead of creating a duplicate.
    async fn create_booking(&self, request: &NewBooking) -> Result<CreatedBooking, EngineError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<CreatedBooking>, EngineError>;
}

/// Vehicle status progression and the views derived from it.
#[async_trait]
pub trait VehicleLifecycle: Send + Sync {
    /// Transition every IN vehicle whose in-time has passed to OUT.
    /// Idempotent; never touches the slot counter. Returns the number of
    /// vehicles moved.
    async fn sweep_due_vehicles(&self) -> Result<u64, EngineError>;

    /// Close out an OUT vehicle: status DONE, out-time now, the given
    /// remark, and the owning lot's slot released, atomically.
    async fn settle(&self, vehicle_id: Uuid, remark: &str) -> Result<Vehicle, EngineError>;

    /// IN vehicles whose in-time is still in the future.
    async fn upcoming(&self, lot_id: Option<Uuid>) -> Result<Vec<Vehicle>, EngineError>;

    /// IN vehicles whose in-time has passed but which the sweep has not yet
    /// moved to OUT, plus OUT vehicles awaiting settlement.
    async fn due(&self, lot_id: Option<Uuid>) -> Result<Vec<Vehicle>, EngineError>;
}

/// Administration of lots and vehicle categories.
#[async_trait]
pub trait LotDirectory: Send + Sync {
    async fn create_lot(
        &self,
        location: &str,
        total_slot: i32,
        price_per_hour: i32,
        admin_id: &str,
    ) -> Result<ParkingLot, EngineError>;

    async fn get_lot(&self, id: Uuid) -> Result<Option<ParkingLot>, EngineError>;

    async fn list_lots(&self) -> Result<Vec<ParkingLot>, EngineError>;

    /// Fails while any booking still references the lot.
    async fn delete_lot(&self, id: Uuid) -> Result<(), EngineError>;

    async fn create_category(&self, label: &str) -> Result<Category, EngineError>;

    async fn list_categories(&self) -> Result<Vec<Category>, EngineError>;

    /// Fails while any vehicle still references the category.
    async fn delete_category(&self, id: Uuid) -> Result<(), EngineError>;
}
