use serde::Serialize;

use crate::attendance::repo_types::StatusCounts;
use crate::stats::{percentage, round2};

/// Raw tallies for one organization.
#[derive(Debug, Clone, Copy, Default)]
pub struct Totals {
    pub students: i64,
    pub teachers: i64,
    pub parents: i64,
    pub classrooms: i64,
    pub quizzes: i64,
    pub members: i64,
    pub responses: i64,
    pub mean_score: Option<f64>,
    pub attendance: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_parents: i64,
    pub total_classrooms: i64,
    pub total_quizzes: i64,
    pub total_responses: i64,
    pub total_members: i64,
    pub average_quiz_score: f64,
    pub quiz_completion_rate: f64,
    pub attendance_rate: f64,
}

impl From<Totals> for DashboardStats {
    fn from(t: Totals) -> Self {
        let a = t.attendance;
        Self {
            total_students: t.students,
            total_teachers: t.teachers,
            total_parents: t.parents,
            total_classrooms: t.classrooms,
            total_quizzes: t.quizzes,
            total_responses: t.responses,
            total_members: t.members,
            average_quiz_score: t.mean_score.map(|s| round2(s * 100.0)).unwrap_or(0.0),
            quiz_completion_rate: percentage(t.responses, t.quizzes.saturating_mul(t.students)),
            attendance_rate: percentage(a.present + a.late, a.present + a.absent + a.late),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_organization_reports_zeroes() {
        let stats = DashboardStats::from(Totals::default());
        assert_eq!(stats.average_quiz_score, 0.0);
        assert_eq!(stats.quiz_completion_rate, 0.0);
        assert_eq!(stats.attendance_rate, 0.0);
    }

    #[test]
    fn rates_are_percentages_with_two_decimals() {
        let stats = DashboardStats::from(Totals {
            students: 3,
            quizzes: 2,
            responses: 4,
            mean_score: Some(0.8125),
            attendance: StatusCounts {
                present: 5,
                absent: 3,
                late: 1,
            },
            ..Totals::default()
        });
        assert_eq!(stats.average_quiz_score, 81.25);
        assert_eq!(stats.quiz_completion_rate, 66.67);
        assert_eq!(stats.attendance_rate, 66.67);
        assert_eq!(stats.total_responses, 4);
    }
}
