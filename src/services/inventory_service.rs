// src/services/inventory_service.rs

use sqlx::PgPool;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        units::{kg_to_tons, tons_to_kg},
    },
    db::InventoryRepository,
    models::inventory::{InventoryItem, StockAdjustmentPayload},
};

#[derive(Clone)]
pub struct InventoryService {
    repo: InventoryRepository,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(repo: InventoryRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    /// Administrative stock correction, outside the normal custody/sorting
    /// flow. Returns the new balance in tons.
    pub async fn adjust_stock(&self, payload: &StockAdjustmentPayload) -> Result<f64, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;
        let new_balance_kg = self
            .repo
            .adjust(&mut *tx, &payload.material_name, tons_to_kg(payload.delta_tons))
            .await?;
        tx.commit().await?;

        tracing::info!(
            material = %payload.material_name,
            delta_tons = payload.delta_tons,
            "manual stock adjustment"
        );
        Ok(kg_to_tons(new_balance_kg))
    }

    pub async fn snapshot(&self) -> Result<Vec<InventoryItem>, AppError> {
        let rows = self.repo.snapshot().await?;
        Ok(rows
            .into_iter()
            .map(|row| InventoryItem {
                id: row.id,
                material_name: row.material_name,
                current_stock_tons: kg_to_tons(row.current_stock_kg),
            })
            .collect())
    }
}
