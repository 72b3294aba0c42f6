// src/db/custody_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::{
    common::{error::AppError, units::kg_to_tons},
    models::custody::{EntryStatus, InwardEntry, Partner},
};

// Raw row as stored: weights in kilograms. Converted to the tons-facing
// model before leaving the repository.
#[derive(Debug, FromRow)]
struct InwardEntryRow {
    id: i32,
    vehicle_number: String,
    source_name: Option<String>,
    party_name: Option<String>,
    material: Option<String>,
    entry_type: String,
    original_entry_type: Option<String>,
    gross_weight: f64,
    tare_weight: Option<f64>,
    net_weight: Option<f64>,
    #[sqlx(try_from = "String")]
    status: EntryStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<InwardEntryRow> for InwardEntry {
    fn from(row: InwardEntryRow) -> Self {
        InwardEntry {
            id: row.id,
            vehicle_number: row.vehicle_number,
            source_name: row.source_name,
            party_name: row.party_name,
            material: row.material,
            entry_type: row.entry_type,
            original_entry_type: row.original_entry_type,
            gross_weight_tons: kg_to_tons(row.gross_weight),
            tare_weight_tons: row.tare_weight.map(kg_to_tons),
            net_weight_tons: row.net_weight.map(kg_to_tons),
            status: row.status,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

/// What `complete`/`delete` need to know about a record while holding its
/// row lock.
#[derive(Debug, FromRow)]
pub struct LockedEntry {
    pub gross_weight: f64,
    pub entry_type: String,
    #[sqlx(try_from = "String")]
    pub status: EntryStatus,
}

// Shared projection: partner joins are outer joins, because records with
// missing source/party information are valid.
const ENTRY_PROJECTION: &str = r#"
    SELECT ie.id, ie.vehicle_number,
           COALESCE(s.name, d.name) AS source_name,
           pt.name AS party_name,
           ie.material, ie.entry_type, ie.original_entry_type,
           ie.gross_weight, ie.tare_weight, ie.net_weight,
           ie.status, ie.created_at, ie.completed_at
    FROM inward_entries ie
    LEFT JOIN partners s ON ie.source_id = s.id
    LEFT JOIN partners d ON ie.destination_id = d.id
    LEFT JOIN partners pt ON ie.party_id = pt.id
"#;

#[derive(Clone)]
pub struct CustodyRepository {
    pool: PgPool,
}

impl CustodyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        vehicle_number: &str,
        source_id: Option<i32>,
        destination_id: Option<i32>,
        party_id: Option<i32>,
        material: Option<&str>,
        entry_type: &str,
        gross_weight_kg: f64,
        created_by_user_id: i32,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO inward_entries
                (vehicle_number, source_id, destination_id, party_id, material,
                 entry_type, gross_weight, created_by_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(vehicle_number)
        .bind(source_id)
        .bind(destination_id)
        .bind(party_id)
        .bind(material)
        .bind(entry_type)
        .bind(gross_weight_kg)
        .bind(created_by_user_id)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    /// Locks the row for the rest of the transaction, so a concurrent
    /// completion or deletion of the same record waits here and then sees the
    /// new status.
    pub async fn lock_entry<'e, E>(
        &self,
        executor: E,
        entry_id: i32,
    ) -> Result<Option<LockedEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let locked = sqlx::query_as::<_, LockedEntry>(
            "SELECT gross_weight, entry_type, status FROM inward_entries WHERE id = $1 FOR UPDATE",
        )
        .bind(entry_id)
        .fetch_optional(executor)
        .await?;
        Ok(locked)
    }

    pub async fn mark_completed<'e, E>(
        &self,
        executor: E,
        entry_id: i32,
        tare_weight_kg: f64,
        net_weight_kg: f64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE inward_entries
            SET tare_weight = $1, net_weight = $2, status = 'Completed',
                completed_at = CURRENT_TIMESTAMP
            WHERE id = $3
            "#,
        )
        .bind(tare_weight_kg)
        .bind(net_weight_kg)
        .bind(entry_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    // The export branch: rewrites the entry type but keeps the one recorded
    // at the gate in original_entry_type.
    pub async fn mark_completed_as_export<'e, E>(
        &self,
        executor: E,
        entry_id: i32,
        tare_weight_kg: f64,
        net_weight_kg: f64,
        material: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE inward_entries
            SET tare_weight = $1, net_weight = $2, status = 'Completed',
                completed_at = CURRENT_TIMESTAMP, material = $3,
                original_entry_type = entry_type, entry_type = $4
            WHERE id = $5
            "#,
        )
        .bind(tare_weight_kg)
        .bind(net_weight_kg)
        .bind(material)
        .bind(crate::models::custody::ENTRY_TYPE_ITEM_EXPORT)
        .bind(entry_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, entry_id: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM inward_entries WHERE id = $1")
            .bind(entry_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn fetch<'e, E>(
        &self,
        executor: E,
        entry_id: i32,
    ) -> Result<Option<InwardEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!("{ENTRY_PROJECTION} WHERE ie.id = $1");
        let row = sqlx::query_as::<_, InwardEntryRow>(&query)
            .bind(entry_id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(InwardEntry::from))
    }

    pub async fn list_pending(&self) -> Result<Vec<InwardEntry>, AppError> {
        let query = format!("{ENTRY_PROJECTION} WHERE ie.status = 'Pending' ORDER BY ie.created_at DESC");
        let rows = sqlx::query_as::<_, InwardEntryRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(InwardEntry::from).collect())
    }

    pub async fn list_completed(&self) -> Result<Vec<InwardEntry>, AppError> {
        let query =
            format!("{ENTRY_PROJECTION} WHERE ie.status = 'Completed' ORDER BY ie.completed_at DESC");
        let rows = sqlx::query_as::<_, InwardEntryRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(InwardEntry::from).collect())
    }

    // The partners table has a unique name; a duplicate insert surfaces as a
    // Conflict through the error mapping.
    pub async fn insert_partner(
        &self,
        name: &str,
        partner_type: &str,
    ) -> Result<Partner, AppError> {
        let partner = sqlx::query_as::<_, Partner>(
            "INSERT INTO partners (name, type) VALUES ($1, $2) RETURNING id, name, type",
        )
        .bind(name)
        .bind(partner_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(partner)
    }

    pub async fn list_partners(&self) -> Result<Vec<Partner>, AppError> {
        let partners =
            sqlx::query_as::<_, Partner>("SELECT id, name, type FROM partners ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(partners)
    }
}
