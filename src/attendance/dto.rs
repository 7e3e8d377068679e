use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::iso_date;
use super::repo_types::{AttendanceRecord, AttendanceSession, StatusCounts};
use crate::stats::percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
            Self::Late => "Late",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(with = "iso_date")]
    pub date: Date,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkEntry {
    #[serde(alias = "studentId")]
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub records: Vec<MarkEntry>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: AttendanceSession,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceSummary {
    pub student_id: Uuid,
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub attendance_percentage: f64,
}

impl AttendanceSummary {
    /// Late still counts as attended.
    pub fn from_counts(student_id: Uuid, c: StatusCounts) -> Self {
        let total = c.present + c.absent + c.late;
        Self {
            student_id,
            total,
            present: c.present,
            absent: c.absent,
            late: c.late,
            attendance_percentage: percentage(c.present + c.late, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_counts_toward_attendance() {
        let s = AttendanceSummary::from_counts(
            Uuid::new_v4(),
            StatusCounts {
                present: 1,
                absent: 1,
                late: 1,
            },
        );
        assert_eq!(s.total, 3);
        assert_eq!(s.attendance_percentage, 66.67);
    }

    #[test]
    fn no_records_means_zero_percent() {
        let s = AttendanceSummary::from_counts(Uuid::new_v4(), StatusCounts::default());
        assert_eq!(s.total, 0);
        assert_eq!(s.attendance_percentage, 0.0);
    }

    #[test]
    fn mark_request_parses_statuses_and_dates() {
        let body: MarkAttendanceRequest = serde_json::from_str(&format!(
            r#"{{"records":[{{"studentId":"{}","status":"Late","notes":"bus"}}]}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(body.records[0].status, AttendanceStatus::Late);

        let open: OpenSessionRequest = serde_json::from_str(r#"{"date":"2024-09-02"}"#).unwrap();
        assert_eq!(open.date.to_string(), "2024-09-02");

        assert!(serde_json::from_str::<MarkEntry>(r#"{"student_id":"00000000-0000-0000-0000-000000000000","status":"Sick"}"#).is_err());
    }
}
