// src/services/identity_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{RbacRepository, UserRepository},
    models::auth::{ApproveUserPayload, AssignRolePayload, Principal, User, VerifiedCredential},
};

#[derive(Clone)]
pub struct IdentityService {
    user_repo: UserRepository,
    rbac_repo: RbacRepository,
    pool: PgPool,
}

impl IdentityService {
    pub fn new(user_repo: UserRepository, rbac_repo: RbacRepository, pool: PgPool) -> Self {
        Self {
            user_repo,
            rbac_repo,
            pool,
        }
    }

    /// Turns a verified credential into the Principal every guarded
    /// operation is checked against.
    ///
    /// Roles and permissions are recomputed from the relational source on
    /// every call, so a revocation takes effect on the next request without
    /// re-authentication. The approval flag is re-read from the database for
    /// the same reason; the one baked into the credential only short-circuits.
    pub async fn resolve(&self, credential: &VerifiedCredential) -> Result<Principal, AppError> {
        if !credential.is_approved {
            return Err(AppError::Unapproved);
        }

        let user = self
            .user_repo
            .find_by_id(credential.user_id)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        if !user.is_approved {
            return Err(AppError::Unapproved);
        }

        let roles = self.rbac_repo.roles_for_user(user.id).await?;
        let permissions = self.rbac_repo.permissions_for_user(user.id).await?;

        Ok(Principal {
            user_id: user.id,
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Approves a pending account and assigns its single role, atomically.
    pub async fn approve_user(
        &self,
        user_id: i32,
        payload: &ApproveUserPayload,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = self.user_repo.set_approved(&mut *tx, user_id).await?;
        if updated == 0 {
            return Err(AppError::NotFound("user"));
        }

        self.user_repo
            .upsert_role(&mut *tx, user_id, payload.role_id)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id, role_id = payload.role_id, "user approved");
        Ok(())
    }

    /// Reassigns a user's role. Insert-or-overwrite, never insert-then-conflict.
    pub async fn assign_role(
        &self,
        user_id: i32,
        payload: &AssignRolePayload,
    ) -> Result<(), AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let mut tx = self.pool.begin().await?;
        self.user_repo
            .upsert_role(&mut *tx, user_id, payload.role_id)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id, role_id = payload.role_id, "role reassigned");
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list_all().await
    }

    pub async fn list_pending_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list_pending().await
    }

    pub async fn delete_user(&self, user_id: i32) -> Result<(), AppError> {
        let deleted = self.user_repo.delete(user_id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound("user"));
        }
        Ok(())
    }
}
