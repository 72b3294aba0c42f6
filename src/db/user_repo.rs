// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{common::error::AppError, models::auth::User};

// The user repository, responsible for the 'users' and 'user_roles' tables.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: i32) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, username, email, designation, is_approved, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    // Listing joins through user_roles so callers see the assigned role name;
    // users without a role come back with role_name = NULL.
    pub async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.full_name, u.username, u.email, u.designation,
                   u.is_approved, u.created_at, r.name AS role_name
            FROM users u
            LEFT JOIN user_roles ur ON u.id = ur.user_id
            LEFT JOIN roles r ON ur.role_id = r.id
            ORDER BY u.full_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn list_pending(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, username, email, designation, is_approved, created_at
            FROM users
            WHERE is_approved = false
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn set_approved<'e, E>(&self, executor: E, user_id: i32) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE users SET is_approved = true WHERE id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // Insert-or-overwrite: the UNIQUE constraint on user_roles.user_id keeps
    // the one-role-per-user invariant, and the upsert replaces the role
    // instead of conflicting.
    pub async fn upsert_role<'e, E>(
        &self,
        executor: E,
        user_id: i32,
        role_id: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET role_id = EXCLUDED.role_id
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, user_id: i32) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
