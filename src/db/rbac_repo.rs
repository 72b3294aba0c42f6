// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::auth::{Permission, Role},
};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_actions<'e, E>(&self, executor: E) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let actions = sqlx::query_scalar::<_, String>("SELECT action FROM permissions")
            .fetch_all(executor)
            .await?;
        Ok(actions)
    }

    pub async fn insert_action<'e, E>(&self, executor: E, action: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO permissions (action) VALUES ($1) ON CONFLICT (action) DO NOTHING")
            .bind(action)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions =
            sqlx::query_as::<_, Permission>("SELECT id, action FROM permissions ORDER BY action ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(permissions)
    }

    pub async fn role_exists<'e, E>(&self, executor: E, role_id: i32) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1)")
                .bind(role_id)
                .fetch_one(executor)
                .await?;
        Ok(exists)
    }

    pub async fn permission_ids_for_role(&self, role_id: i32) -> Result<Vec<i32>, AppError> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT permission_id FROM role_permissions WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn clear_role_permissions<'e, E>(
        &self,
        executor: E,
        role_id: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn add_role_permission<'e, E>(
        &self,
        executor: E,
        role_id: i32,
        permission_id: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(permission_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // The (0 or 1) role names attached to a user. Recomputed per request; the
    // process never caches claims.
    pub async fn roles_for_user(&self, user_id: i32) -> Result<Vec<String>, AppError> {
        let roles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name
            FROM roles r
            JOIN user_roles ur ON r.id = ur.role_id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    pub async fn permissions_for_user(&self, user_id: i32) -> Result<Vec<String>, AppError> {
        let permissions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.action
            FROM permissions p
            JOIN role_permissions rp ON p.id = rp.permission_id
            JOIN user_roles ur ON rp.role_id = ur.role_id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }
}
