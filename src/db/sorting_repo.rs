// src/db/sorting_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::common::error::AppError;

#[derive(Debug, FromRow)]
pub struct SortingLogRow {
    pub id: i32,
    pub log_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct SortedMaterialRow {
    pub sorting_log_id: i32,
    pub material_name: String,
    pub quantity_kg: f64,
}

#[derive(Clone)]
pub struct SortingRepository {
    pool: PgPool,
}

impl SortingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // One header per (date, user). A resubmission for the same day touches
    // the timestamp instead of failing.
    pub async fn upsert_log<'e, E>(
        &self,
        executor: E,
        log_date: NaiveDate,
        created_by_user_id: i32,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO sorting_logs (log_date, created_by_user_id)
            VALUES ($1, $2)
            ON CONFLICT (log_date, created_by_user_id)
            DO UPDATE SET created_at = CURRENT_TIMESTAMP
            RETURNING id
            "#,
        )
        .bind(log_date)
        .bind(created_by_user_id)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    // Additive upsert: repeated submissions of the same material accumulate,
    // they do not overwrite.
    pub async fn add_quantity<'e, E>(
        &self,
        executor: E,
        sorting_log_id: i32,
        material_name: &str,
        quantity_kg: f64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO sorted_materials (sorting_log_id, material_name, quantity_kg)
            VALUES ($1, $2, $3)
            ON CONFLICT (sorting_log_id, material_name)
            DO UPDATE SET quantity_kg = sorted_materials.quantity_kg + $3
            "#,
        )
        .bind(sorting_log_id)
        .bind(material_name)
        .bind(quantity_kg)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_logs(&self) -> Result<Vec<SortingLogRow>, AppError> {
        let logs = sqlx::query_as::<_, SortingLogRow>(
            r#"
            SELECT id, log_date, created_at
            FROM sorting_logs
            ORDER BY log_date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    pub async fn list_materials(&self) -> Result<Vec<SortedMaterialRow>, AppError> {
        let rows = sqlx::query_as::<_, SortedMaterialRow>(
            r#"
            SELECT sorting_log_id, material_name, quantity_kg
            FROM sorted_materials
            ORDER BY sorting_log_id, material_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
