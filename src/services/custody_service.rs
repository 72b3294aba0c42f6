// src/services/custody_service.rs

use sqlx::PgPool;
use validator::Validate;

use crate::{
    common::{error::AppError, units::tons_to_kg},
    db::{CustodyRepository, InventoryRepository},
    models::custody::{
        CompleteInwardEntryPayload, CreateInwardEntryPayload, CreatePartnerPayload, EntryStatus,
        InwardEntry, Partner, ENTRY_TYPE_EMPTY_VEHICLE,
    },
};

/// `netWeight = |gross − tare|`: the record does not distinguish over- and
/// under-weighing direction.
fn net_weight_kg(gross_kg: f64, tare_kg: f64) -> f64 {
    (gross_kg - tare_kg).abs()
}

#[derive(Debug, PartialEq)]
enum CompletionKind<'a> {
    /// Completes with the original material and entry type; no ledger
    /// mutation.
    Plain,
    /// A vehicle logged empty is leaving loaded: retroactively an export
    /// event. Rewrites the entry type and debits the ledger.
    Export { material: &'a str },
}

fn classify_completion<'a>(
    entry_type: &str,
    material_override: Option<&'a str>,
) -> CompletionKind<'a> {
    match material_override {
        Some(material) if !material.is_empty() && entry_type == ENTRY_TYPE_EMPTY_VEHICLE => {
            CompletionKind::Export { material }
        }
        _ => CompletionKind::Plain,
    }
}

#[derive(Clone)]
pub struct CustodyService {
    repo: CustodyRepository,
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl CustodyService {
    pub fn new(repo: CustodyRepository, inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self {
            repo,
            inventory_repo,
            pool,
        }
    }

    /// First weighing: opens a custody record in `Pending` with only the
    /// gross weight known.
    pub async fn open(
        &self,
        payload: &CreateInwardEntryPayload,
        created_by_user_id: i32,
    ) -> Result<InwardEntry, AppError> {
        payload.validate()?;

        let gross_weight_kg = tons_to_kg(payload.gross_weight_tons);
        let id = self
            .repo
            .insert(
                &self.pool,
                &payload.vehicle_number,
                payload.source_id,
                payload.destination_id,
                payload.party_id,
                payload.material.as_deref(),
                &payload.entry_type,
                gross_weight_kg,
                created_by_user_id,
            )
            .await?;

        tracing::info!(entry_id = id, vehicle = %payload.vehicle_number, "inward entry opened");

        self.repo
            .fetch(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("inward entry"))
    }

    /// Second weighing: the one irreversible transition, `Pending` →
    /// `Completed`.
    ///
    /// Everything runs in one transaction behind a row lock, so two
    /// concurrent completions of the same record serialize: the second one
    /// sees the new status and fails with `Conflict`, and the ledger is
    /// debited exactly once.
    pub async fn complete(
        &self,
        entry_id: i32,
        payload: &CompleteInwardEntryPayload,
    ) -> Result<InwardEntry, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let locked = self
            .repo
            .lock_entry(&mut *tx, entry_id)
            .await?
            .ok_or(AppError::NotFound("inward entry"))?;

        if locked.status != EntryStatus::Pending {
            return Err(AppError::Conflict("entry is already completed".into()));
        }

        let tare_weight_kg = tons_to_kg(payload.tare_weight_tons);
        let net_kg = net_weight_kg(locked.gross_weight, tare_weight_kg);

        match classify_completion(&locked.entry_type, payload.material.as_deref()) {
            CompletionKind::Export { material } => {
                self.repo
                    .mark_completed_as_export(&mut *tx, entry_id, tare_weight_kg, net_kg, material)
                    .await?;
                // The outgoing shipment reduces on-site stock, in the same
                // transaction as the status change.
                self.inventory_repo
                    .adjust(&mut *tx, material, -net_kg)
                    .await?;
            }
            CompletionKind::Plain => {
                self.repo
                    .mark_completed(&mut *tx, entry_id, tare_weight_kg, net_kg)
                    .await?;
            }
        }

        let entry = self
            .repo
            .fetch(&mut *tx, entry_id)
            .await?
            .ok_or(AppError::NotFound("inward entry"))?;

        tx.commit().await?;
        tracing::info!(entry_id, net_kg, "inward entry completed");
        Ok(entry)
    }

    /// Deletion is the only other exit from `Pending`. Completed records are
    /// never deleted, to keep the ledger auditable.
    pub async fn delete(&self, entry_id: i32) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let locked = self
            .repo
            .lock_entry(&mut *tx, entry_id)
            .await?
            .ok_or(AppError::NotFound("inward entry"))?;

        if locked.status != EntryStatus::Pending {
            return Err(AppError::Conflict(
                "only pending entries can be deleted".into(),
            ));
        }

        self.repo.delete(&mut *tx, entry_id).await?;
        tx.commit().await?;

        tracing::info!(entry_id, "inward entry deleted");
        Ok(())
    }

    pub async fn list_pending(&self) -> Result<Vec<InwardEntry>, AppError> {
        self.repo.list_pending().await
    }

    pub async fn list_completed(&self) -> Result<Vec<InwardEntry>, AppError> {
        self.repo.list_completed().await
    }

    /// Registers a source, destination, or party that entries can reference.
    /// Names are unique; re-registering one is a `Conflict`.
    pub async fn create_partner(&self, payload: &CreatePartnerPayload) -> Result<Partner, AppError> {
        payload.validate()?;

        let partner = self
            .repo
            .insert_partner(&payload.name, &payload.partner_type)
            .await?;
        tracing::info!(partner_id = partner.id, name = %partner.name, "partner registered");
        Ok(partner)
    }

    pub async fn list_partners(&self) -> Result<Vec<Partner>, AppError> {
        self.repo.list_partners().await
    }
}
