use serde::Deserialize;
use uuid::Uuid;

use crate::people::NewPerson;

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    #[serde(flatten)]
    pub person: NewPerson,
    #[serde(default, alias = "gradeLevel")]
    pub grade_level: String,
    #[serde(alias = "medicalInfo")]
    pub medical_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    #[serde(alias = "gradeLevel")]
    pub grade_level: Option<String>,
    #[serde(alias = "medicalInfo")]
    pub medical_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkParentRequest {
    #[serde(alias = "parentId")]
    pub parent_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_camel_case_and_flattened_person() {
        let body: CreateStudentRequest = serde_json::from_str(
            r#"{"email":"kid@school.edu","name":"Kid","gradeLevel":"5","medicalInfo":"asthma"}"#,
        )
        .unwrap();
        assert_eq!(body.person.email, "kid@school.edu");
        assert_eq!(body.grade_level, "5");
        assert_eq!(body.medical_info.as_deref(), Some("asthma"));
        assert!(body.person.password.is_none());
    }
}
