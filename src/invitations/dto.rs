use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Invitation, InvitationRow};
use super::services::InvitationState;
use crate::access::MemberRole;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub emails: Vec<String>,
    #[serde(default = "default_role")]
    pub role: MemberRole,
}

fn default_role() -> MemberRole {
    MemberRole::Member
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub invited: usize,
    pub existing: usize,
    pub invitations: Vec<Invitation>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub organization_id: Uuid,
    pub role: String,
    pub already_member: bool,
}

#[derive(Debug, Serialize)]
pub struct InvitationView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub email: String,
    pub role: String,
    pub inviter_name: String,
    pub state: InvitationState,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl InvitationView {
    pub fn from_row(row: InvitationRow, now: OffsetDateTime) -> Self {
        Self {
            state: InvitationState::derive(&row.status, row.expires_at, now),
            id: row.id,
            organization_id: row.organization_id,
            organization_name: row.organization_name,
            email: row.email,
            role: row.role,
            inviter_name: row.inviter_name,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}
