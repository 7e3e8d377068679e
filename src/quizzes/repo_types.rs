use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Submitted answers keyed by question id.
pub type Answers = BTreeMap<Uuid, String>;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub question_count: i64,
    pub response_count: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub position: i32,
    pub prompt: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResponseRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub answers: Json<Answers>,
    pub score: f64,
    pub completed_at: OffsetDateTime,
}
