use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use parkline_core::error::EngineError;
use parkline_core::lifecycle;
use parkline_core::models::{Vehicle, VehicleStatus};
use parkline_core::repository::VehicleLifecycle;

use crate::slot_ledger;

pub struct StoreVehicleLifecycle {
    pool: PgPool,
}

impl StoreVehicleLifecycle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    booking_id: Uuid,
    category_id: Uuid,
    company: String,
    registration: String,
    in_time: DateTime<Utc>,
    out_time: Option<DateTime<Utc>>,
    status: String,
    remark: Option<String>,
}

impl VehicleRow {
    fn into_vehicle(self) -> Result<Vehicle, EngineError> {
        let status: VehicleStatus = self.status.parse().map_err(EngineError::storage)?;

        Ok(Vehicle {
            id: self.id,
            booking_id: self.booking_id,
            category_id: self.category_id,
            company: self.company,
            registration: self.registration,
            in_time: self.in_time,
            out_time: self.out_time,
            status,
            remark: self.remark,
        })
    }
}

const SELECT_VEHICLE: &str = "SELECT v.id, v.booking_id, v.category_id, v.company, \
     v.registration, v.in_time, v.out_time, v.status, v.remark \
     FROM vehicles v JOIN bookings b ON b.id = v.booking_id";

#[async_trait]
impl VehicleLifecycle for StoreVehicleLifecycle {
    async fn sweep_due_vehicles(&self) -> Result<u64, EngineError> {
        // One bulk update; re-running when nothing changed is a no-op and
        // the slot counter is untouched either way.
        let result = sqlx::query(
            "UPDATE vehicles SET status = 'OUT' WHERE status = 'IN' AND in_time <= NOW()",
        )
        .execute(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        let moved = result.rows_affected();
        if moved > 0 {
            info!(moved, "sweep transitioned due vehicles IN -> OUT");
        }
        Ok(moved)
    }

    async fn settle(&self, vehicle_id: Uuid, remark: &str) -> Result<Vehicle, EngineError> {
        if remark.trim().is_empty() {
            return Err(EngineError::validation("settlement requires a non-empty remark"));
        }

        let mut tx = self.pool.begin().await.map_err(EngineError::storage)?;

        // Row lock serializes concurrent settles and the sweep on this
        // vehicle; the loser of the race sees the updated status.
        let row: Option<VehicleRow> = sqlx::query_as(
            "SELECT id, booking_id, category_id, company, registration, in_time, out_time, status, remark \
             FROM vehicles WHERE id = $1 FOR UPDATE",
        )
        .bind(vehicle_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(EngineError::storage)?;

        let vehicle = row
            .ok_or(EngineError::VehicleNotFound(vehicle_id))?
            .into_vehicle()?;

        lifecycle::ensure_transition(vehicle.status, VehicleStatus::Done)?;

        let out_time = Utc::now();
        sqlx::query("UPDATE vehicles SET status = 'DONE', out_time = $1, remark = $2 WHERE id = $3")
            .bind(out_time)
            .bind(remark)
            .bind(vehicle_id)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;

        let lot: Option<(Uuid,)> = sqlx::query_as("SELECT parking_lot_id FROM bookings WHERE id = $1")
            .bind(vehicle.booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(EngineError::storage)?;

        // A vehicle must never end up DONE with its slot still booked; a
        // missing booking here aborts the whole settlement.
        let (lot_id,) = lot.ok_or(EngineError::BookingNotFound(vehicle.booking_id))?;

        slot_ledger::release(&mut *tx, lot_id).await?;

        tx.commit().await.map_err(EngineError::storage)?;

        info!(%vehicle_id, %lot_id, "vehicle settled, slot released");

        Ok(Vehicle {
            status: VehicleStatus::Done,
            out_time: Some(out_time),
            remark: Some(remark.to_string()),
            ..vehicle
        })
    }

    async fn upcoming(&self, lot_id: Option<Uuid>) -> Result<Vec<Vehicle>, EngineError> {
        let filter = "WHERE v.status = 'IN' AND v.in_time > NOW()";

        let rows: Vec<VehicleRow> = match lot_id {
            Some(lot) => {
                sqlx::query_as(&format!(
                    "{SELECT_VEHICLE} {filter} AND b.parking_lot_id = $1 ORDER BY v.in_time"
                ))
                .bind(lot)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!("{SELECT_VEHICLE} {filter} ORDER BY v.in_time"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(EngineError::storage)?;

        rows.into_iter().map(VehicleRow::into_vehicle).collect()
    }

    async fn due(&self, lot_id: Option<Uuid>) -> Result<Vec<Vehicle>, EngineError> {
        let filter =
            "WHERE ((v.status = 'IN' AND v.in_time <= NOW()) OR v.status = 'OUT')";

        let rows: Vec<VehicleRow> = match lot_id {
            Some(lot) => {
                sqlx::query_as(&format!(
                    "{SELECT_VEHICLE} {filter} AND b.parking_lot_id = $1 ORDER BY v.in_time"
                ))
                .bind(lot)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!("{SELECT_VEHICLE} {filter} ORDER BY v.in_time"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(EngineError::storage)?;

        rows.into_iter().map(VehicleRow::into_vehicle).collect()
    }
}
