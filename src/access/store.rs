use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::rbac::{GlobalRole, MemberRole};
use crate::error::AppResult;

/// Read side of users and memberships as seen by the permission gate.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Global role of an active user; `None` for unknown or banned users.
    async fn global_role(&self, user_id: Uuid) -> AppResult<Option<GlobalRole>>;

    async fn membership(&self, user_id: Uuid, organization_id: Uuid) -> AppResult<Option<MemberRole>>;
}

#[derive(Clone)]
pub struct PgAccessStore {
    db: PgPool,
}

impl PgAccessStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn global_role(&self, user_id: Uuid) -> AppResult<Option<GlobalRole>> {
        let row = sqlx::query_as::<_, (String, bool)>(
            r#"SELECT role, banned FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.and_then(|(role, banned)| {
            if banned {
                None
            } else {
                GlobalRole::parse(&role)
            }
        }))
    }

    async fn membership(&self, user_id: Uuid, organization_id: Uuid) -> AppResult<Option<MemberRole>> {
        let role = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role
              FROM members
             WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(role.as_deref().and_then(MemberRole::parse))
    }
}
