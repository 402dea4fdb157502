use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use parkline_core::error::EngineError;
use parkline_core::models::{Category, ParkingLot};
use parkline_core::repository::LotDirectory;

pub struct StoreLotDirectory {
    pool: PgPool,
}

impl StoreLotDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct LotRow {
    id: Uuid,
    location: String,
    total_slot: i32,
    booked_slot: i32,
    price_per_hour: i32,
    admin_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LotRow> for ParkingLot {
    fn from(row: LotRow) -> Self {
        ParkingLot {
            id: row.id,
            location: row.location,
            total_slot: row.total_slot,
            booked_slot: row.booked_slot,
            price_per_hour: row.price_per_hour,
            admin_id: row.admin_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    label: String,
}

const SELECT_LOT: &str = "SELECT id, location, total_slot, booked_slot, price_per_hour, \
     admin_id, created_at, updated_at FROM parking_lots";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl LotDirectory for StoreLotDirectory {
    async fn create_lot(
        &self,
        location: &str,
        total_slot: i32,
        price_per_hour: i32,
        admin_id: &str,
    ) -> Result<ParkingLot, EngineError> {
        if location.trim().is_empty() {
            return Err(EngineError::validation("lot location must not be empty"));
        }
        if total_slot <= 0 {
            return Err(EngineError::validation("total_slot must be positive"));
        }
        if price_per_hour < 0 {
            return Err(EngineError::validation("price_per_hour must not be negative"));
        }

        let now = Utc::now();
        let lot = ParkingLot {
            id: Uuid::new_v4(),
            location: location.to_string(),
            total_slot,
            booked_slot: 0,
            price_per_hour,
            admin_id: admin_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO parking_lots (id, location, total_slot, booked_slot, price_per_hour, admin_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(lot.id)
        .bind(&lot.location)
        .bind(lot.total_slot)
        .bind(lot.booked_slot)
        .bind(lot.price_per_hour)
        .bind(&lot.admin_id)
        .bind(lot.created_at)
        .bind(lot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(EngineError::storage)?;

        Ok(lot)
    }

    async fn get_lot(&self, id: Uuid) -> Result<Option<ParkingLot>, EngineError> {
        let row: Option<LotRow> = sqlx::query_as(&format!("{SELECT_LOT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(EngineError::storage)?;

        Ok(row.map(ParkingLot::from))
    }

    async fn list_lots(&self) -> Result<Vec<ParkingLot>, EngineError> {
        let rows: Vec<LotRow> = sqlx::query_as(&format!("{SELECT_LOT} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await
            .map_err(EngineError::storage)?;

        Ok(rows.into_iter().map(ParkingLot::from).collect())
    }

    async fn delete_lot(&self, id: Uuid) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await.map_err(EngineError::storage)?;

        let referenced: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE parking_lot_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(EngineError::storage)?;

        if referenced.0 > 0 {
            return Err(EngineError::validation(
                "lot has bookings and cannot be deleted",
            ));
        }

        let result = sqlx::query("DELETE FROM parking_lots WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::LotNotFound(id));
        }

        tx.commit().await.map_err(EngineError::storage)?;
        Ok(())
    }

    async fn create_category(&self, label: &str) -> Result<Category, EngineError> {
        if label.trim().is_empty() {
            return Err(EngineError::validation("category label must not be empty"));
        }

        let category = Category {
            id: Uuid::new_v4(),
            label: label.to_string(),
        };

        sqlx::query("INSERT INTO categories (id, label) VALUES ($1, $2)")
            .bind(category.id)
            .bind(&category.label)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    EngineError::validation(format!("category '{label}' already exists"))
                } else {
                    EngineError::storage(e)
                }
            })?;

        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, EngineError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, label FROM categories ORDER BY label")
                .fetch_all(&self.pool)
                .await
                .map_err(EngineError::storage)?;

        Ok(rows
            .into_iter()
            .map(|row| Category {
                id: row.id,
                label: row.label,
            })
            .collect())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await.map_err(EngineError::storage)?;

        let referenced: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vehicles WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(EngineError::storage)?;

        if referenced.0 > 0 {
            return Err(EngineError::validation(
                "category is referenced by vehicles and cannot be deleted",
            ));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(EngineError::storage)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::CategoryNotFound(id));
        }

        tx.commit().await.map_err(EngineError::storage)?;
        Ok(())
    }
}
