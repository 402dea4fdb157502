use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use parkline_core::error::EngineError;
use parkline_core::models::{
    is_payment_marker, Booking, CreatedBooking, NewBooking, Vehicle, VehicleStatus,
};
use parkline_core::repository::BookingEngine;

use crate::slot_ledger;

pub struct StoreBookingEngine {
    pool: PgPool,
}

impl StoreBookingEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingVehicleRow {
    booking_id: Uuid,
    user_id: String,
    parking_lot_id: Uuid,
    payment_id: String,
    booking_created_at: DateTime<Utc>,
    vehicle_id: Uuid,
    category_id: Uuid,
    company: String,
    registration: String,
    in_time: DateTime<Utc>,
    out_time: Option<DateTime<Utc>>,
    status: String,
    remark: Option<String>,
}

impl BookingVehicleRow {
    fn into_created(self) -> Result<CreatedBooking, EngineError> {
        let status: VehicleStatus = self.status.parse().map_err(EngineError::storage)?;

        Ok(CreatedBooking {
            booking: Booking {
                id: self.booking_id,
                user_id: self.user_id,
                parking_lot_id: self.parking_lot_id,
                payment_id: self.payment_id,
                created_at: self.booking_created_at,
            },
            vehicle: Vehicle {
                id: self.vehicle_id,
                booking_id: self.booking_id,
                category_id: self.category_id,
                company: self.company,
                registration: self.registration,
                in_time: self.in_time,
                out_time: self.out_time,
                status,
                remark: self.remark,
            },
        })
    }
}

const SELECT_PAIR: &str = "SELECT b.id AS booking_id, b.user_id, b.parking_lot_id, b.payment_id, \
     b.created_at AS booking_created_at, v.id AS vehicle_id, v.category_id, v.company, \
     v.registration, v.in_time, v.out_time, v.status, v.remark \
     FROM bookings b JOIN vehicles v ON v.booking_id = b.id";

async fn find_by_payment_id(
    conn: &mut PgConnection,
    payment_id: &str,
) -> Result<Option<CreatedBooking>, EngineError> {
    let row: Option<BookingVehicleRow> =
        sqlx::query_as(&format!("{SELECT_PAIR} WHERE b.payment_id = $1"))
            .bind(payment_id)
            .fetch_optional(conn)
            .await
            .map_err(EngineError::storage)?;

    row.map(BookingVehicleRow::into_created).transpose()
}

async fn find_by_vehicle_key(
    conn: &mut PgConnection,
    registration: &str,
    in_time: DateTime<Utc>,
) -> Result<Option<CreatedBooking>, EngineError> {
    let row: Option<BookingVehicleRow> =
        sqlx::query_as(&format!("{SELECT_PAIR} WHERE v.registration = $1 AND v.in_time = $2"))
            .bind(registration)
            .bind(in_time)
            .fetch_optional(conn)
            .await
            .map_err(EngineError::storage)?;

    row.map(BookingVehicleRow::into_created).transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl BookingEngine for StoreBookingEngine {
    async fn create_booking(&self, request: &NewBooking) -> Result<CreatedBooking, EngineError> {
        let mut tx = self.pool.begin().await.map_err(EngineError::storage)?;

        // Gateways retry their callbacks; a transaction id we have already
        // converted maps to the existing booking, never a second one.
        if !is_payment_marker(&request.payment_id) {
            if let Some(existing) = find_by_payment_id(&mut *tx, &request.payment_id).await? {
                info!(payment_id = %request.payment_id, booking_id = %existing.booking.id,
                    "replayed payment confirmation, returning existing booking");
                return Ok(existing);
            }
            if let Some(existing) =
                find_by_vehicle_key(&mut *tx, &request.vehicle.registration, request.vehicle.in_time)
                    .await?
            {
                info!(registration = %request.vehicle.registration, booking_id = %existing.booking.id,
                    "vehicle already booked for this in-time, returning existing booking");
                return Ok(existing);
            }
        }

        let category: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE id = $1")
            .bind(request.vehicle.category_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(EngineError::storage)?;
        if category.is_none() {
            return Err(EngineError::CategoryNotFound(request.vehicle.category_id));
        }

        // Locks the lot row and validates capacity; also fails fast on a
        // missing lot. Held until commit.
        slot_ledger::reserve(&mut *tx, request.parking_lot_id).await?;

        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            parking_lot_id: request.parking_lot_id,
            payment_id: request.payment_id.clone(),
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO bookings (id, user_id, parking_lot_id, payment_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(booking.id)
        .bind(&booking.user_id)
        .bind(booking.parking_lot_id)
        .bind(&booking.payment_id)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            // A concurrent confirmation of the same transaction id wins the
            // unique index on payment_id. Roll back our slot reservation and
            // hand back the winner's booking.
            if is_unique_violation(&err) && !is_payment_marker(&request.payment_id) {
                tx.rollback().await.map_err(EngineError::storage)?;
                let mut conn = self.pool.acquire().await.map_err(EngineError::storage)?;
                if let Some(existing) = find_by_payment_id(&mut *conn, &request.payment_id).await? {
                    return Ok(existing);
                }
            }
            return Err(EngineError::storage(err));
        }

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            category_id: request.vehicle.category_id,
            company: request.vehicle.company.clone(),
            registration: request.vehicle.registration.clone(),
            in_time: request.vehicle.in_time,
            out_time: None,
            status: VehicleStatus::In,
            remark: None,
        };

        sqlx::query(
            "INSERT INTO vehicles (id, booking_id, category_id, company, registration, in_time, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(vehicle.id)
        .bind(vehicle.booking_id)
        .bind(vehicle.category_id)
        .bind(&vehicle.company)
        .bind(&vehicle.registration)
        .bind(vehicle.in_time)
        .bind(vehicle.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(EngineError::storage)?;

        tx.commit().await.map_err(EngineError::storage)?;

        info!(booking_id = %booking.id, lot_id = %booking.parking_lot_id, payment_id = %booking.payment_id,
            "booking created");

        Ok(CreatedBooking { booking, vehicle })
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<CreatedBooking>, EngineError> {
        let mut conn = self.pool.acquire().await.map_err(EngineError::storage)?;

        let row: Option<BookingVehicleRow> =
            sqlx::query_as(&format!("{SELECT_PAIR} WHERE b.id = $1"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(EngineError::storage)?;

        row.map(BookingVehicleRow::into_created).transpose()
    }
}
