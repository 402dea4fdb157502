use sqlx::PgConnection;
use uuid::Uuid;

use parkline_core::error::EngineError;

// Single writer of `parking_lots.booked_slot`. Both functions borrow the
// caller's open transaction so the counter mutation commits or rolls back
// together with the booking or settlement that caused it.

/// Count one slot against the lot. Locks the lot row for the remainder of
/// the enclosing transaction, so two reservations against the last free
/// slot serialize and exactly one succeeds.
pub async fn reserve(conn: &mut PgConnection, lot_id: Uuid) -> Result<(), EngineError> {
    let row: Option<(i32, i32)> =
        sqlx::query_as("SELECT total_slot, booked_slot FROM parking_lots WHERE id = $1 FOR UPDATE")
            .bind(lot_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(EngineError::storage)?;

    let (total_slot, booked_slot) = row.ok_or(EngineError::LotNotFound(lot_id))?;

    if booked_slot >= total_slot {
        return Err(EngineError::NoAvailableSlots(lot_id));
    }

    sqlx::query("UPDATE parking_lots SET booked_slot = booked_slot + 1, updated_at = NOW() WHERE id = $1")
        .bind(lot_id)
        .execute(&mut *conn)
        .await
        .map_err(EngineError::storage)?;

    Ok(())
}

/// Give one slot back. Called exactly once per vehicle, at settlement. A
/// decrement that would drive the counter below zero is a broken invariant,
/// not a user-facing condition: it is logged fatal and fails the enclosing
/// transaction.
pub async fn release(conn: &mut PgConnection, lot_id: Uuid) -> Result<(), EngineError> {
    let result =
        sqlx::query("UPDATE parking_lots SET booked_slot = booked_slot - 1, updated_at = NOW() WHERE id = $1 AND booked_slot > 0")
            .bind(lot_id)
            .execute(&mut *conn)
            .await
            .map_err(EngineError::storage)?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM parking_lots WHERE id = $1")
        .bind(lot_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(EngineError::storage)?;

    match exists {
        None => Err(EngineError::LotNotFound(lot_id)),
        Some(_) => {
            tracing::error!(%lot_id, "booked_slot would underflow; release called without a matching reserve");
            Err(EngineError::SlotUnderflow(lot_id))
        }
    }
}
