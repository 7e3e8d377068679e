use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Answers, Question, Quiz, ResponseRow};
use super::services::percent;

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub correct_answer: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuizRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

/// `questions`, when present, replaces the whole question list.
#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<QuestionInput>>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub answers: Answers,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl QuestionView {
    pub fn new(q: Question, reveal: bool) -> Self {
        Self {
            id: q.id,
            position: q.position,
            prompt: q.prompt,
            options: q.options.0,
            correct_answer: reveal.then_some(q.correct_answer),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub struct ResponseView {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub score: f64,
    pub percent: i64,
    pub completed_at: OffsetDateTime,
}

impl From<ResponseRow> for ResponseView {
    fn from(r: ResponseRow) -> Self {
        Self {
            id: r.id,
            quiz_id: r.quiz_id,
            user_id: r.user_id,
            user_name: r.user_name,
            user_email: r.user_email,
            percent: percent(r.score),
            score: r.score,
            completed_at: r.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewItem {
    pub question_id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub options: Vec<String>,
    pub submitted: Option<String>,
    pub correct_answer: String,
    pub correct: bool,
    pub verdict: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ResponseReview {
    pub response: ResponseView,
    pub correct_count: usize,
    pub question_count: usize,
    pub items: Vec<ReviewItem>,
}
