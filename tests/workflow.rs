// End-to-end workflow tests against a real Postgres.
//
// Run with: cargo test --features pg-tests
// Each test gets its own database (sqlx::test) with ./migrations applied.
#![cfg(feature = "pg-tests")]

use chrono::NaiveDate;
use sqlx::PgPool;

use mrf_backend::{
    common::error::AppError,
    config::{AppState, PermissionCatalog},
    models::{
        auth::{ApproveUserPayload, ReplaceRolePermissionsPayload, VerifiedCredential},
        custody::{
            CompleteInwardEntryPayload, CreateInwardEntryPayload, CreatePartnerPayload,
            CreateSortingLogPayload, EntryStatus, SortedMaterialEntry,
        },
        inventory::StockAdjustmentPayload,
    },
    services::rbac_service,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

async fn seed_user(pool: &PgPool) -> i32 {
    init_tracing();
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (full_name, email, is_approved) VALUES ($1, $2, true) RETURNING id",
    )
    .bind("Gate Operator")
    .bind("operator@mrf.test")
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_role(pool: &PgPool, name: &str) -> i32 {
    sqlx::query_scalar::<_, i32>("INSERT INTO roles (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn stock_kg(pool: &PgPool, material: &str) -> Option<f64> {
    sqlx::query_scalar::<_, f64>(
        "SELECT current_stock_kg FROM inventory WHERE material_name = $1",
    )
    .bind(material)
    .fetch_optional(pool)
    .await
    .unwrap()
}

fn open_payload(entry_type: &str, gross_tons: f64) -> CreateInwardEntryPayload {
    CreateInwardEntryPayload {
        vehicle_number: "MH12AB1234".into(),
        source_id: None,
        destination_id: None,
        party_id: None,
        material: None,
        entry_type: entry_type.into(),
        gross_weight_tons: gross_tons,
    }
}

#[sqlx::test]
async fn empty_vehicle_completion_becomes_an_export(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;

    let opened = state
        .custody_service
        .open(&open_payload("Empty Vehicle", 12.5), user_id)
        .await
        .unwrap();
    assert_eq!(opened.status, EntryStatus::Pending);
    assert_eq!(opened.gross_weight_tons, 12.5);

    let completed = state
        .custody_service
        .complete(
            opened.id,
            &CompleteInwardEntryPayload {
                tare_weight_tons: 5.0,
                material: Some("plastic".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(completed.status, EntryStatus::Completed);
    assert_eq!(completed.entry_type, "Item Export");
    assert_eq!(completed.original_entry_type.as_deref(), Some("Empty Vehicle"));
    assert_eq!(completed.material.as_deref(), Some("plastic"));
    assert_eq!(completed.net_weight_tons, Some(7.5));

    // The outgoing shipment debited the ledger by 7500 kg.
    assert_eq!(stock_kg(&pool, "plastic").await, Some(-7500.0));
}

#[sqlx::test]
async fn plain_completion_leaves_the_ledger_alone(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;

    let opened = state
        .custody_service
        .open(&open_payload("Material Inward", 10.0), user_id)
        .await
        .unwrap();

    let completed = state
        .custody_service
        .complete(
            opened.id,
            &CompleteInwardEntryPayload {
                tare_weight_tons: 4.0,
                material: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(completed.entry_type, "Material Inward");
    assert_eq!(completed.original_entry_type, None);
    assert_eq!(completed.net_weight_tons, Some(6.0));
    assert!(state.inventory_service.snapshot().await.unwrap().is_empty());
}

#[sqlx::test]
async fn completing_twice_fails_and_debits_once(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;

    let opened = state
        .custody_service
        .open(&open_payload("Empty Vehicle", 12.5), user_id)
        .await
        .unwrap();

    let payload = CompleteInwardEntryPayload {
        tare_weight_tons: 5.0,
        material: Some("plastic".into()),
    };
    state
        .custody_service
        .complete(opened.id, &payload)
        .await
        .unwrap();

    let second = state.custody_service.complete(opened.id, &payload).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    assert_eq!(stock_kg(&pool, "plastic").await, Some(-7500.0));
}

#[sqlx::test]
async fn concurrent_completions_debit_exactly_once(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;

    let opened = state
        .custody_service
        .open(&open_payload("Empty Vehicle", 12.5), user_id)
        .await
        .unwrap();

    let payload = CompleteInwardEntryPayload {
        tare_weight_tons: 5.0,
        material: Some("plastic".into()),
    };
    // Both completions race for the same row lock; whichever acquires it
    // second sees the committed status.
    let (first, second) = tokio::join!(
        state.custody_service.complete(opened.id, &payload),
        state.custody_service.complete(opened.id, &payload),
    );

    let failures: Vec<_> = [first, second]
        .into_iter()
        .filter_map(Result::err)
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], AppError::Conflict(_)));

    assert_eq!(stock_kg(&pool, "plastic").await, Some(-7500.0));
}

#[sqlx::test]
async fn pending_entries_delete_but_completed_ones_do_not(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;

    let pending = state
        .custody_service
        .open(&open_payload("Material Inward", 8.0), user_id)
        .await
        .unwrap();
    state.custody_service.delete(pending.id).await.unwrap();
    assert!(matches!(
        state.custody_service.delete(pending.id).await,
        Err(AppError::NotFound(_))
    ));

    let completed = state
        .custody_service
        .open(&open_payload("Material Inward", 8.0), user_id)
        .await
        .unwrap();
    state
        .custody_service
        .complete(
            completed.id,
            &CompleteInwardEntryPayload {
                tare_weight_tons: 3.0,
                material: None,
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        state.custody_service.delete(completed.id).await,
        Err(AppError::Conflict(_))
    ));
}

#[sqlx::test]
async fn sorting_resubmission_accumulates(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;
    let log_date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

    let submit = |tons: f64| CreateSortingLogPayload {
        log_date,
        entries: vec![SortedMaterialEntry {
            material: "paper".into(),
            quantity_tons: tons,
        }],
    };

    state
        .sorting_service
        .record(&submit(10.0), user_id)
        .await
        .unwrap();
    state
        .sorting_service
        .record(&submit(5.0), user_id)
        .await
        .unwrap();

    // One log for the (date, user) pair, with the accumulated quantity.
    let logs = state.sorting_service.list().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].entries.len(), 1);
    assert_eq!(logs[0].entries[0].quantity_tons, 15.0);

    // The ledger was credited twice, 10 then 5.
    assert_eq!(stock_kg(&pool, "paper").await, Some(15000.0));
}

#[sqlx::test]
async fn partners_join_into_custody_listings(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;

    let source = state
        .custody_service
        .create_partner(&CreatePartnerPayload {
            name: "Pune Municipal Depot".into(),
            partner_type: "Source".into(),
        })
        .await
        .unwrap();

    let mut payload = open_payload("Material Inward", 9.0);
    payload.source_id = Some(source.id);
    let opened = state.custody_service.open(&payload, user_id).await.unwrap();
    assert_eq!(opened.source_name.as_deref(), Some("Pune Municipal Depot"));

    let listed = state.custody_service.list_partners().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].partner_type, "Source");
}

#[sqlx::test]
async fn duplicate_partner_name_is_a_conflict(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());

    let payload = CreatePartnerPayload {
        name: "Shakti Traders".into(),
        partner_type: "Party".into(),
    };
    state.custody_service.create_partner(&payload).await.unwrap();

    let duplicate = state.custody_service.create_partner(&payload).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    assert!(duplicate.unwrap_err().is_client_error());
}

#[sqlx::test]
async fn manual_adjustment_can_drive_stock_negative(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());

    let balance = state
        .inventory_service
        .adjust_stock(&StockAdjustmentPayload {
            material_name: "glass".into(),
            delta_tons: -2.0,
        })
        .await
        .unwrap();
    assert_eq!(balance, -2.0);
    assert_eq!(stock_kg(&pool, "glass").await, Some(-2000.0));

    let snapshot = state.inventory_service.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].material_name, "glass");
    assert_eq!(snapshot[0].current_stock_tons, -2.0);
}

#[sqlx::test]
async fn reconcile_is_idempotent_and_insert_only(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());

    let catalog = PermissionCatalog::current();
    state.reconcile_permissions(&catalog).await.unwrap();
    let after_first = state.rbac_service.list_permissions().await.unwrap();
    assert_eq!(after_first.len(), catalog.actions().len());

    state.reconcile_permissions(&catalog).await.unwrap();
    let after_second = state.rbac_service.list_permissions().await.unwrap();
    assert_eq!(after_first.len(), after_second.len());

    // A shorter catalog never deletes what is already registered.
    let trimmed = PermissionCatalog::new(3, vec!["view:dashboard"]);
    state.reconcile_permissions(&trimmed).await.unwrap();
    let after_trimmed = state.rbac_service.list_permissions().await.unwrap();
    assert_eq!(after_trimmed.len(), after_second.len());
}

#[sqlx::test]
async fn duplicate_permission_ids_are_a_conflict_and_roll_back(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let role_id = seed_role(&pool, "Clerk").await;

    state.reconcile_permissions(&PermissionCatalog::current()).await.unwrap();
    let view_dashboard = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM permissions WHERE action = 'view:dashboard'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    state
        .rbac_service
        .replace_role_permissions(
            role_id,
            &ReplaceRolePermissionsPayload {
                permission_ids: vec![view_dashboard],
            },
        )
        .await
        .unwrap();

    let result = state
        .rbac_service
        .replace_role_permissions(
            role_id,
            &ReplaceRolePermissionsPayload {
                permission_ids: vec![view_dashboard, view_dashboard],
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // The failed replacement rolled back; the earlier grant is intact.
    assert_eq!(
        state
            .rbac_service
            .permission_ids_for_role(role_id)
            .await
            .unwrap(),
        vec![view_dashboard]
    );
}

#[sqlx::test]
async fn principal_reflects_role_changes_on_next_resolve(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = seed_user(&pool).await;
    let role_id = seed_role(&pool, "Supervisor").await;

    state.reconcile_permissions(&PermissionCatalog::current()).await.unwrap();
    let view_assets = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM permissions WHERE action = 'view:assets'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    state
        .identity_service
        .approve_user(user_id, &ApproveUserPayload { role_id })
        .await
        .unwrap();
    state
        .rbac_service
        .replace_role_permissions(
            role_id,
            &ReplaceRolePermissionsPayload {
                permission_ids: vec![view_assets],
            },
        )
        .await
        .unwrap();

    let credential = VerifiedCredential {
        user_id,
        is_approved: true,
    };
    let principal = state.identity_service.resolve(&credential).await.unwrap();
    assert!(rbac_service::check(&principal, "view:assets").is_ok());
    assert!(matches!(
        rbac_service::check(&principal, "create:assets"),
        Err(AppError::Forbidden(_))
    ));

    // Wholesale replacement revokes on the very next resolve.
    state
        .rbac_service
        .replace_role_permissions(
            role_id,
            &ReplaceRolePermissionsPayload {
                permission_ids: vec![],
            },
        )
        .await
        .unwrap();
    let principal = state.identity_service.resolve(&credential).await.unwrap();
    assert!(rbac_service::check(&principal, "view:assets").is_err());
}

#[sqlx::test]
async fn unapproved_accounts_cannot_resolve(pool: PgPool) {
    let state = AppState::with_pool(pool.clone());
    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (full_name, email, is_approved) VALUES ($1, $2, false) RETURNING id",
    )
    .bind("New Hire")
    .bind("newhire@mrf.test")
    .fetch_one(&pool)
    .await
    .unwrap();

    let credential = VerifiedCredential {
        user_id,
        is_approved: false,
    };
    assert!(matches!(
        state.identity_service.resolve(&credential).await,
        Err(AppError::Unapproved)
    ));
}
