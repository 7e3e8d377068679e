use serde::Deserialize;

use crate::people::NewPerson;

#[derive(Debug, Deserialize)]
pub struct CreateParentRequest {
    #[serde(flatten)]
    pub person: NewPerson,
    #[serde(default)]
    pub relationship: String,
    pub occupation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateParentRequest {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub occupation: Option<String>,
}
