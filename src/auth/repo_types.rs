use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                     // unique user ID
    pub email: String,                // login email, lowercase
    pub name: String,                 // display name
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub role: String,                 // "member" | "super-admin"
    pub banned: bool,
    pub ban_reason: Option<String>,
    pub created_at: OffsetDateTime,   // creation timestamp
}
