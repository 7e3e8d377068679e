//! Teacher, student and parent profiles all wrap a user account that is a
//! member of the profile's organization.

pub mod provision;

use serde::Deserialize;

/// Account fields accepted when a profile is created.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPerson {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: Option<String>,
}
