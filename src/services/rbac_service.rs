// src/services/rbac_service.rs

use std::collections::HashSet;

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    config::PermissionCatalog,
    db::RbacRepository,
    models::auth::{Permission, Principal, ReplaceRolePermissionsPayload, Role},
};

/// The authorization guard. Deny-by-default: only the exact permission
/// string allows the operation, and a denial is a `Forbidden`, never a
/// `NotFound`, so the caller cannot probe for resource existence.
pub fn check(principal: &Principal, required_permission: &str) -> Result<(), AppError> {
    if principal.has_permission(required_permission) {
        return Ok(());
    }
    tracing::warn!(
        user_id = principal.user_id,
        permission = required_permission,
        "permission denied"
    );
    Err(AppError::Forbidden(required_permission.to_string()))
}

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
    pool: PgPool,
}

impl RbacService {
    pub fn new(repo: RbacRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    /// Reconciles the stored permission set with the catalog: inserts every
    /// action the store is missing, deletes nothing. Safe to run on every
    /// process start; running it twice is a no-op.
    pub async fn reconcile(&self, catalog: &PermissionCatalog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: HashSet<String> =
            self.repo.list_actions(&mut *tx).await?.into_iter().collect();

        let mut added = 0;
        for action in catalog.actions() {
            if !existing.contains(*action) {
                self.repo.insert_action(&mut *tx, action).await?;
                tracing::info!(action, "registered new permission");
                added += 1;
            }
        }

        tx.commit().await?;
        tracing::info!(
            version = catalog.version(),
            added,
            "permission catalog reconciled"
        );
        Ok(())
    }

    /// Replaces a role's permission set wholesale (full diff-and-replace;
    /// roles are never patched incrementally).
    pub async fn replace_role_permissions(
        &self,
        role_id: i32,
        payload: &ReplaceRolePermissionsPayload,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        if !self.repo.role_exists(&mut *tx, role_id).await? {
            return Err(AppError::NotFound("role"));
        }

        self.repo.clear_role_permissions(&mut *tx, role_id).await?;
        for permission_id in &payload.permission_ids {
            self.repo
                .add_role_permission(&mut *tx, role_id, *permission_id)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(
            role_id,
            count = payload.permission_ids.len(),
            "role permissions replaced"
        );
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        self.repo.list_roles().await
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.repo.list_permissions().await
    }

    pub async fn permission_ids_for_role(&self, role_id: i32) -> Result<Vec<i32>, AppError> {
        self.repo.permission_ids_for_role(role_id).await
    }
}
