use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Grade {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub classroom_id: Uuid,
    pub subject: String,
    pub grading_period: String,
    pub value: String,
    pub comments: Option<String>,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct SubjectValue {
    pub subject: String,
    pub value: String,
}
