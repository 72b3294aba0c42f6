// src/services/sorting_service.rs

use std::collections::HashMap;

use sqlx::PgPool;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        units::{kg_to_tons, tons_to_kg},
    },
    db::{InventoryRepository, SortingRepository},
    models::custody::{CreateSortingLogPayload, SortedMaterialEntry, SortingLog},
};

#[derive(Clone)]
pub struct SortingService {
    repo: SortingRepository,
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl SortingService {
    pub fn new(repo: SortingRepository, inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self {
            repo,
            inventory_repo,
            pool,
        }
    }

    /// Records a sorting session. One transaction covers the header upsert,
    /// every per-material accumulation and every ledger credit, so a partial
    /// application is never observable.
    ///
    /// Sorting always credits stock: unsorted inbound material becomes a
    /// categorized, sellable one.
    pub async fn record(
        &self,
        payload: &CreateSortingLogPayload,
        created_by_user_id: i32,
    ) -> Result<(), AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let log_id = self
            .repo
            .upsert_log(&mut *tx, payload.log_date, created_by_user_id)
            .await?;

        for entry in &payload.entries {
            let quantity_kg = tons_to_kg(entry.quantity_tons);
            self.repo
                .add_quantity(&mut *tx, log_id, &entry.material, quantity_kg)
                .await?;
            self.inventory_repo
                .adjust(&mut *tx, &entry.material, quantity_kg)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(
            log_id,
            log_date = %payload.log_date,
            entries = payload.entries.len(),
            "sorting log recorded"
        );
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<SortingLog>, AppError> {
        let headers = self.repo.list_logs().await?;
        let materials = self.repo.list_materials().await?;

        let mut entries_by_log: HashMap<i32, Vec<SortedMaterialEntry>> = HashMap::new();
        for row in materials {
            entries_by_log
                .entry(row.sorting_log_id)
                .or_default()
                .push(SortedMaterialEntry {
                    material: row.material_name,
                    quantity_tons: kg_to_tons(row.quantity_kg),
                });
        }

        Ok(headers
            .into_iter()
            .map(|header| SortingLog {
                id: header.id,
                log_date: header.log_date,
                created_at: header.created_at,
                entries: entries_by_log.remove(&header.id).unwrap_or_default(),
            })
            .collect())
    }
}
