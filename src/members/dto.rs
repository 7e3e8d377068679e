use serde::Deserialize;

use crate::access::MemberRole;

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}
