//! Integration tests for seeding the default permission catalog.

mod common;

use tenantgate_authz::PermissionCatalog;
use tenantgate_core::catalog::DEFAULT_PERMISSIONS;
use tenantgate_core::repository::{PermissionRepository, Repositories};
use tokio::task::JoinSet;

#[tokio::test]
async fn sequential_seeding_creates_each_code_once() {
    let h = common::setup_empty().await;
    let catalog = PermissionCatalog::new(h.repos.clone());

    assert_eq!(catalog.ensure_defaults().await.unwrap(), DEFAULT_PERMISSIONS.len());
    assert_eq!(catalog.ensure_defaults().await.unwrap(), 0);
    assert_eq!(
        h.repos.permissions().list_all().await.unwrap().len(),
        DEFAULT_PERMISSIONS.len()
    );
}

#[tokio::test]
async fn concurrent_seeding_creates_each_code_once() {
    let h = common::setup_empty().await;

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let catalog = PermissionCatalog::new(h.repos.clone());
        tasks.spawn(async move { catalog.ensure_defaults().await });
    }
    let mut created = 0;
    while let Some(result) = tasks.join_next().await {
        created += result.unwrap().unwrap();
    }

    assert_eq!(created, DEFAULT_PERMISSIONS.len());
    assert_eq!(
        h.repos.permissions().list_all().await.unwrap().len(),
        DEFAULT_PERMISSIONS.len()
    );
}

#[tokio::test]
async fn seeding_keeps_deactivated_permissions_inactive() {
    let h = common::setup().await;
    h.repos
        .permissions()
        .set_active("communications.send", false)
        .await
        .unwrap();

    PermissionCatalog::new(h.repos.clone())
        .ensure_defaults()
        .await
        .unwrap();
    let p = h
        .repos
        .permissions()
        .get_by_code("communications.send")
        .await
        .unwrap();
    assert!(!p.active);
}
