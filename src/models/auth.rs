// src/models/auth.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// What comes out of the database (users table). The password hash never
// leaves the credential verifier, so it is not modelled here.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub full_name: String,
    pub username: Option<String>,
    pub email: String,
    pub designation: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    // Only populated by listings that join through user_roles.
    #[sqlx(default)]
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: i32,
    pub action: String,
}

/// What the credential verifier (external collaborator) hands us once a
/// token has been checked: a trusted user id plus the approval flag that was
/// current at issue time.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCredential {
    pub user_id: i32,
    pub is_approved: bool,
}

/// The identity an operation is authorized against. Computed fresh from the
/// relational source on every request and never cached, so a permission
/// revocation takes effect on the next call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: i32,
    pub roles: HashSet<String>,
    pub permissions: HashSet<String>,
}

impl Principal {
    /// Exact-match lookup. There is no hierarchy or wildcard matching:
    /// `manage:users` does not imply `view:users`.
    pub fn has_permission(&self, action: &str) -> bool {
        self.permissions.contains(action)
    }
}

// The payload for approving a pending account (assigns its single role).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveUserPayload {
    pub role_id: i32,
}

// The payload for reassigning a user's role.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolePayload {
    pub role_id: i32,
}

// Wholesale replacement of a role's permission set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRolePermissionsPayload {
    pub permission_ids: Vec<i32>,
}
