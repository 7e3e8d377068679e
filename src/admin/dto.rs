use serde::Deserialize;

use crate::access::GlobalRole;

#[derive(Debug, Default, Deserialize)]
pub struct BanRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: GlobalRole,
}

/// Optional narrowing for the users listing, read from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<GlobalRole>,
    pub banned: Option<bool>,
}
