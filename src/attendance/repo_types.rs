use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::iso_date;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceSession {
    pub id: Uuid,
    pub classroom_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub created_at: OffsetDateTime,
}

/// Session listing row with per-status tallies.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SessionSummary {
    pub id: Uuid,
    pub classroom_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub status: String,
    pub notes: Option<String>,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct StatusCounts {
    pub present: i64,
    pub absent: i64,
    pub late: i64,
}
