use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateGradeRequest {
    #[serde(alias = "studentId")]
    pub student_id: Uuid,
    pub subject: String,
    #[serde(alias = "gradingPeriod")]
    pub grading_period: String,
    pub value: String,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGradeRequest {
    pub subject: Option<String>,
    #[serde(alias = "gradingPeriod")]
    pub grading_period: Option<String>,
    pub value: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAverage {
    pub subject: String,
    pub average: Option<f64>,
    pub graded: u32,
    pub ungraded: u32,
}

#[derive(Debug, Serialize)]
pub struct GradeSummary {
    pub student_id: Uuid,
    pub subjects: Vec<SubjectAverage>,
    pub overall_average: Option<f64>,
}
