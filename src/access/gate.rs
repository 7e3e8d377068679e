use std::future::Future;

use tracing::{debug, warn};
use uuid::Uuid;

use super::rbac::{is_allowed, Action, GlobalRole, MemberRole, Resource};
use super::store::AccessStore;
use crate::error::{AppError, AppResult};

/// Outcome of a successful gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub global: GlobalRole,
    pub membership: Option<MemberRole>,
}

impl Grant {
    pub fn is_super_admin(&self) -> bool {
        self.global == GlobalRole::SuperAdmin
    }

    /// Admin/owner in the organization, or super-admin.
    pub fn is_manager(&self) -> bool {
        self.is_super_admin() || self.membership.map(|r| r.is_manager()).unwrap_or(false)
    }

    pub fn is_owner(&self) -> bool {
        self.is_super_admin() || self.membership == Some(MemberRole::Owner)
    }
}

pub async fn authorize(
    store: &dyn AccessStore,
    user_id: Uuid,
    organization_id: Uuid,
    resource: Resource,
    action: Action,
) -> AppResult<Grant> {
    let (global, membership) = tokio::try_join!(
        store.global_role(user_id),
        store.membership(user_id, organization_id)
    )?;

    let Some(global) = global else {
        warn!(%user_id, "gate: unknown or banned user");
        return Err(AppError::unauthenticated());
    };

    if !is_allowed(global, membership, resource, action) {
        warn!(
            %user_id,
            %organization_id,
            resource = resource.as_str(),
            action = action.as_str(),
            "access denied"
        );
        return Err(AppError::access_denied());
    }

    debug!(%user_id, %organization_id, resource = resource.as_str(), action = action.as_str(), "access granted");
    Ok(Grant { global, membership })
}

/// Runs `op` only when the caller may perform `action` on `resource` inside
/// `organization_id`.
pub async fn with_scoped_permission<T, F, Fut>(
    store: &dyn AccessStore,
    user_id: Uuid,
    organization_id: Uuid,
    resource: Resource,
    action: Action,
    op: F,
) -> AppResult<T>
where
    F: FnOnce(Grant) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let grant = authorize(store, user_id, organization_id, resource, action).await?;
    op(grant).await
}

/// Super-admin only operations outside any organization.
pub async fn require_super_admin(store: &dyn AccessStore, user_id: Uuid) -> AppResult<()> {
    match store.global_role(user_id).await? {
        Some(GlobalRole::SuperAdmin) => Ok(()),
        Some(_) => Err(AppError::access_denied()),
        None => Err(AppError::unauthenticated()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryAccessStore {
        pub users: Mutex<HashMap<Uuid, GlobalRole>>,
        pub members: Mutex<HashMap<(Uuid, Uuid), MemberRole>>,
    }

    impl MemoryAccessStore {
        pub fn with_user(self, user: Uuid, role: GlobalRole) -> Self {
            self.users.lock().unwrap().insert(user, role);
            self
        }

        pub fn with_member(self, user: Uuid, org: Uuid, role: MemberRole) -> Self {
            self.members.lock().unwrap().insert((user, org), role);
            self
        }
    }

    #[async_trait]
    impl AccessStore for MemoryAccessStore {
        async fn global_role(&self, user_id: Uuid) -> AppResult<Option<GlobalRole>> {
            Ok(self.users.lock().unwrap().get(&user_id).copied())
        }

        async fn membership(&self, user_id: Uuid, org: Uuid) -> AppResult<Option<MemberRole>> {
            Ok(self.members.lock().unwrap().get(&(user_id, org)).copied())
        }
    }

    #[tokio::test]
    async fn non_member_gets_access_denied_and_op_never_runs() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let store = MemoryAccessStore::default().with_user(user, GlobalRole::Member);
        let calls = AtomicUsize::new(0);

        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            let res = with_scoped_permission(&store, user, org, Resource::Student, action, |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
            assert!(matches!(res, Err(AppError::PermissionDenied(ref m)) if m == "Access denied"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn admin_of_other_org_cannot_update_classroom() {
        let admin = Uuid::new_v4();
        let org_o = Uuid::new_v4();
        let org_p = Uuid::new_v4();
        let store = MemoryAccessStore::default()
            .with_user(admin, GlobalRole::Member)
            .with_member(admin, org_o, MemberRole::Admin);

        let res = authorize(&store, admin, org_p, Resource::Classroom, Action::Update).await;
        assert!(matches!(res, Err(AppError::PermissionDenied(_))));

        let grant = authorize(&store, admin, org_o, Resource::Classroom, Action::Update)
            .await
            .unwrap();
        assert!(grant.is_manager());
        assert!(!grant.is_owner());
    }

    #[tokio::test]
    async fn super_admin_passes_without_membership() {
        let root = Uuid::new_v4();
        let store = MemoryAccessStore::default().with_user(root, GlobalRole::SuperAdmin);
        let out = with_scoped_permission(
            &store,
            root,
            Uuid::new_v4(),
            Resource::Organization,
            Action::Delete,
            |grant| async move { Ok(grant.is_super_admin()) },
        )
        .await
        .unwrap();
        assert!(out);
    }

    #[tokio::test]
    async fn member_reads_but_cannot_create() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let store = MemoryAccessStore::default()
            .with_user(user, GlobalRole::Member)
            .with_member(user, org, MemberRole::Member);

        assert!(authorize(&store, user, org, Resource::Quiz, Action::Read).await.is_ok());
        assert!(authorize(&store, user, org, Resource::Quiz, Action::Create).await.is_err());
    }

    #[tokio::test]
    async fn unknown_user_fails_closed() {
        let store = MemoryAccessStore::default();
        let res = authorize(&store, Uuid::new_v4(), Uuid::new_v4(), Resource::Quiz, Action::Read).await;
        assert!(matches!(res, Err(AppError::Unauthenticated(_))));
        let res = require_super_admin(&store, Uuid::new_v4()).await;
        assert!(matches!(res, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn require_super_admin_denies_plain_user() {
        let user = Uuid::new_v4();
        let store = MemoryAccessStore::default().with_user(user, GlobalRole::Member);
        assert!(matches!(
            require_super_admin(&store, user).await,
            Err(AppError::PermissionDenied(_))
        ));
    }
}
