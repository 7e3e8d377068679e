use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Tenant boundary ("campus").
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: OffsetDateTime,
}

/// Organization as listed for one user; `role` is absent for super-admins
/// browsing organizations they do not belong to.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrganizationWithRole {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: OffsetDateTime,
    pub role: Option<String>,
}
