// src/config.rs

use std::{env, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::error::AppError,
    db::{
        CustodyRepository, InventoryRepository, RbacRepository, SortingRepository, UserRepository,
    },
    services::{
        CustodyService, IdentityService, InventoryService, RbacService, SortingService,
    },
};

/// The master permission list: a versioned, append-only configuration value
/// injected into the registry at process start. Adding an action means
/// bumping the version; a shipped version never loses one, so reconciliation
/// can stay insert-only.
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    version: u32,
    actions: Vec<&'static str>,
}

impl PermissionCatalog {
    pub fn new(version: u32, actions: Vec<&'static str>) -> Self {
        Self { version, actions }
    }

    /// The catalog the facility currently runs with.
    pub fn current() -> Self {
        Self::new(
            2,
            vec![
                // User management
                "manage:users",
                "approve:users",
                "manage:roles",
                // Dashboard
                "view:dashboard",
                // Cashbook & sales
                "view:cashbook",
                // Inward entries
                "create:inward_entry",
                "view:inward_entries",
                "complete:inward_entry",
                "log:inbound_material",
                // Sorting
                "create:sorting_log",
                "log:sorted_bale",
                // Assets
                "view:assets",
                "create:assets",
                "edit:assets",
                "delete:assets",
                // Reports
                "generate:reports",
            ],
        )
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn actions(&self) -> &[&'static str] {
        &self.actions
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub identity_service: IdentityService,
    pub rbac_service: RbacService,
    pub custody_service: CustodyService,
    pub sorting_service: SortingService,
    pub inventory_service: InventoryService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("database connection established");
        Ok(Self::with_pool(db_pool))
    }

    // Wires the dependency graph. Also the entry point for tests that bring
    // their own pool.
    pub fn with_pool(db_pool: PgPool) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let custody_repo = CustodyRepository::new(db_pool.clone());
        let sorting_repo = SortingRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());

        let identity_service =
            IdentityService::new(user_repo, rbac_repo.clone(), db_pool.clone());
        let rbac_service = RbacService::new(rbac_repo, db_pool.clone());
        let custody_service =
            CustodyService::new(custody_repo, inventory_repo.clone(), db_pool.clone());
        let sorting_service =
            SortingService::new(sorting_repo, inventory_repo.clone(), db_pool.clone());
        let inventory_service = InventoryService::new(inventory_repo, db_pool.clone());

        Self {
            db_pool,
            identity_service,
            rbac_service,
            custody_service,
            sorting_service,
            inventory_service,
        }
    }

    /// Startup reconciliation of the permission registry against the
    /// injected catalog.
    pub async fn reconcile_permissions(
        &self,
        catalog: &PermissionCatalog,
    ) -> Result<(), AppError> {
        self.rbac_service.reconcile(catalog).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn current_catalog_has_no_duplicates() {
        let catalog = PermissionCatalog::current();
        let unique: HashSet<_> = catalog.actions().iter().collect();
        assert_eq!(unique.len(), catalog.actions().len());
    }

    #[test]
    fn current_catalog_covers_the_custody_workflow() {
        let catalog = PermissionCatalog::current();
        for action in [
            "create:inward_entry",
            "complete:inward_entry",
            "view:inward_entries",
            "create:sorting_log",
        ] {
            assert!(catalog.actions().contains(&action), "missing {action}");
        }
    }

    #[test]
    fn actions_are_verb_resource_namespaced() {
        for action in PermissionCatalog::current().actions() {
            let (verb, resource) = action.split_once(':').expect("missing ':'");
            assert!(!verb.is_empty() && !resource.is_empty());
        }
    }
}
