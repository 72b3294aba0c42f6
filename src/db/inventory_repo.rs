// src/db/inventory_repo.rs

use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::common::error::AppError;

#[derive(Debug, FromRow)]
pub struct InventoryRow {
    pub id: i32,
    pub material_name: String,
    pub current_stock_kg: f64,
}

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies a signed delta (kilograms) to a material's running balance.
    ///
    /// Takes an executor so it can only run on a caller-supplied connection
    /// or transaction: the ledger is mutated in the same transaction as the
    /// custody or sorting event that caused it, never on its own.
    pub async fn adjust<'e, E>(
        &self,
        executor: E,
        material_name: &str,
        delta_kg: f64,
    ) -> Result<f64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Atomic upsert: first adjustment for a material creates its row.
        let new_balance = sqlx::query_scalar::<_, f64>(
            r#"
            INSERT INTO inventory (material_name, current_stock_kg)
            VALUES ($1, $2)
            ON CONFLICT (material_name)
            DO UPDATE SET current_stock_kg = inventory.current_stock_kg + $2,
                          updated_at = CURRENT_TIMESTAMP
            RETURNING current_stock_kg
            "#,
        )
        .bind(material_name)
        .bind(delta_kg)
        .fetch_one(executor)
        .await?;

        // Negative stock is allowed (bookkeeping may lag the physical
        // operation), but it is worth a warning.
        if new_balance < 0.0 {
            tracing::warn!(
                material = material_name,
                stock_kg = new_balance,
                "stock balance went negative"
            );
        }

        Ok(new_balance)
    }

    pub async fn snapshot(&self) -> Result<Vec<InventoryRow>, AppError> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT id, material_name, current_stock_kg
            FROM inventory
            ORDER BY current_stock_kg DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
