use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::students::repo_types::Student;

#[derive(Debug, Deserialize)]
pub struct CreateClassroomRequest {
    pub name: String,
    #[serde(default, alias = "gradeLevel")]
    pub grade_level: String,
    #[serde(default)]
    pub subject: String,
    pub capacity: Option<i32>,
    pub room: Option<String>,
    #[serde(alias = "teacherId")]
    pub teacher_id: Option<Uuid>,
}

/// Absent fields are left alone; `"teacher_id": null` unassigns the teacher.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateClassroomRequest {
    pub name: Option<String>,
    #[serde(alias = "gradeLevel")]
    pub grade_level: Option<String>,
    pub subject: Option<String>,
    pub capacity: Option<i32>,
    pub room: Option<String>,
    #[serde(default, alias = "teacherId", deserialize_with = "present")]
    pub teacher_id: Option<Option<Uuid>>,
}

fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    #[serde(alias = "studentIds")]
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub enrolled: u64,
    pub students: Vec<Student>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_id_distinguishes_missing_from_null() {
        let missing: UpdateClassroomRequest = serde_json::from_str(r#"{"name":"7B"}"#).unwrap();
        assert_eq!(missing.teacher_id, None);

        let cleared: UpdateClassroomRequest = serde_json::from_str(r#"{"teacherId":null}"#).unwrap();
        assert_eq!(cleared.teacher_id, Some(None));

        let id = Uuid::new_v4();
        let set: UpdateClassroomRequest =
            serde_json::from_str(&format!(r#"{{"teacher_id":"{id}"}}"#)).unwrap();
        assert_eq!(set.teacher_id, Some(Some(id)));
    }
}
