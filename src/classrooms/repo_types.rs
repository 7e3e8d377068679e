use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Classroom {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub teacher_name: Option<String>,
    pub name: String,
    pub grade_level: String,
    pub subject: String,
    pub capacity: Option<i32>,
    pub room: Option<String>,
    pub student_count: i64,
    pub created_at: OffsetDateTime,
}

/// Row locked while enrolling so concurrent enrollments see one capacity.
#[derive(Debug, Clone, FromRow)]
pub struct CapacityRow {
    pub organization_id: Uuid,
    pub capacity: Option<i32>,
}
