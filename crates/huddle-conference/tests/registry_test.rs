mod common;

use std::sync::Arc;

use common::{WORKSPACE, setup};
use huddle_core::error::HuddleError;
use huddle_core::models::role::RoleSuffix;
use huddle_core::models::tenant::CreateTenant;
use huddle_core::repository::{RoleRepository, Store, TenantRepository};

#[tokio::test]
async fn warm_up_resolves_every_installed_conference() {
    let h = setup().await;
    h.store
        .tenants()
        .create(CreateTenant {
            name: "Other Conf".into(),
            workspace_id: Some("T0009".into()),
            pending_workspace_name: None,
        })
        .await
        .unwrap();
    h.store
        .tenants()
        .create(CreateTenant {
            name: "Awaiting Install".into(),
            workspace_id: None,
            pending_workspace_name: Some("Future Workspace".into()),
        })
        .await
        .unwrap();

    let report = h.registry.warm_up().await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.succeeded.len(), 2);
    assert!(h.registry.cached(WORKSPACE).is_some());
    assert!(h.registry.cached("T0009").is_some());
}

#[tokio::test]
async fn resolve_is_cached_per_workspace() {
    let h = setup().await;
    let first = h.registry.resolve(WORKSPACE).await.unwrap();
    let second = h.registry.resolve(WORKSPACE).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let err = h.registry.resolve("T-MISSING").await.unwrap_err();
    assert!(matches!(err, HuddleError::NotFound { .. }));
}

#[tokio::test]
async fn resolve_bootstraps_the_default_roles() {
    let h = setup().await;
    h.registry.resolve(WORKSPACE).await.unwrap();

    let admin = h.registry.roles().system_admin_role().await.unwrap();
    for suffix in RoleSuffix::ALL {
        let role = h
            .store
            .roles()
            .find_by_name(&suffix.role_name(h.tenant.id))
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("missing {suffix} role"));
        assert_eq!(role.tenant_id, Some(h.tenant.id));
        assert_eq!(role.granted_to, vec![admin.id]);
    }
}
