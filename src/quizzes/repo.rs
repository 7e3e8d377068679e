use sqlx::{types::Json, PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::dto::QuestionInput;
use super::repo_types::{Answers, Question, Quiz, ResponseRow};
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

const QUIZ_COLUMNS: &str = "q.id, q.organization_id, q.title, q.description, q.created_by, \
     (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id) AS question_count, \
     (SELECT COUNT(*) FROM quiz_responses qr WHERE qr.quiz_id = q.id) AS response_count, \
     q.created_at";

static QUIZZES: ListSpec = ListSpec {
    columns: QUIZ_COLUMNS,
    from: "quizzes q",
    search_columns: &["q.title", "q.description"],
    sort_columns: &[
        ("title", "q.title"),
        ("createdAt", "q.created_at"),
        ("questionCount", "(SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id)"),
    ],
    default_sort: ("q.created_at", SortDirection::Desc),
    tie_breaker: "q.id",
};

const RESPONSE_COLUMNS: &str = "r.id, r.quiz_id, r.user_id, u.name AS user_name, u.email AS user_email, \
                                r.answers, r.score, r.completed_at";
const RESPONSE_FROM: &str = "quiz_responses r JOIN users u ON u.id = r.user_id";

// Sort keys reach into the answering user through the join.
static RESPONSES: ListSpec = ListSpec {
    columns: RESPONSE_COLUMNS,
    from: RESPONSE_FROM,
    search_columns: &["u.name", "u.email"],
    sort_columns: &[
        ("userName", "u.name"),
        ("userEmail", "u.email"),
        ("score", "r.score"),
        ("completedAt", "r.completed_at"),
    ],
    default_sort: ("r.completed_at", SortDirection::Desc),
    tie_breaker: "r.id",
};

pub async fn list(db: &PgPool, organization_id: Uuid, params: &ListParams) -> AppResult<Page<Quiz>> {
    fetch_page(db, &QUIZZES, &[Filter::Id("q.organization_id", organization_id)], params).await
}

pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Quiz>> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes q WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn questions<'e>(db: impl PgExecutor<'e>, quiz_id: Uuid) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, position, prompt, options, correct_answer
          FROM quiz_questions
         WHERE quiz_id = $1
         ORDER BY position ASC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(db)
    .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    title: &str,
    description: &str,
    created_by: Uuid,
) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO quizzes (organization_id, title, description, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(title)
    .bind(description)
    .bind(created_by)
    .fetch_one(&mut **tx)
    .await
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
) -> sqlx::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE quizzes
           SET title = COALESCE($2, title),
               description = COALESCE($3, description)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .execute(&mut **tx)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Replaces the quiz's questions, numbering them from 1 in input order.
pub async fn replace_questions_tx(
    tx: &mut Transaction<'_, Postgres>,
    quiz_id: Uuid,
    questions: &[QuestionInput],
) -> sqlx::Result<()> {
    sqlx::query(r#"DELETE FROM quiz_questions WHERE quiz_id = $1"#)
        .bind(quiz_id)
        .execute(&mut **tx)
        .await?;
    for (i, q) in questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO quiz_questions (quiz_id, position, prompt, options, correct_answer)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(quiz_id)
        .bind(i as i32 + 1)
        .bind(&q.prompt)
        .bind(Json(&q.options))
        .bind(&q.correct_answer)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Children first, then the quiz. Returns whether the quiz existed.
pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> sqlx::Result<bool> {
    sqlx::query(r#"DELETE FROM quiz_responses WHERE quiz_id = $1"#)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(r#"DELETE FROM quiz_questions WHERE quiz_id = $1"#)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    let res = sqlx::query(r#"DELETE FROM quizzes WHERE id = $1"#)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn count(db: &PgPool, organization_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM quizzes WHERE organization_id = $1"#)
        .bind(organization_id)
        .fetch_one(db)
        .await
}

/// Takes the quiz row lock: exclusive for editing questions, shared for
/// submitting, so a submission never scores against questions being replaced.
/// Returns whether the quiz exists.
pub async fn lock_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid, exclusive: bool) -> sqlx::Result<bool> {
    let sql = if exclusive {
        "SELECT id FROM quizzes WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT id FROM quizzes WHERE id = $1 FOR SHARE"
    };
    let found = sqlx::query_scalar::<_, Uuid>(sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(found.is_some())
}

pub async fn response_count_tx(tx: &mut Transaction<'_, Postgres>, quiz_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM quiz_responses WHERE quiz_id = $1"#)
        .bind(quiz_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn insert_response_tx(
    tx: &mut Transaction<'_, Postgres>,
    quiz_id: Uuid,
    user_id: Uuid,
    answers: &Answers,
    score: f64,
) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO quiz_responses (quiz_id, user_id, answers, score)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(user_id)
    .bind(Json(answers))
    .bind(score)
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_response(db: &PgPool, id: Uuid) -> sqlx::Result<Option<ResponseRow>> {
    sqlx::query_as::<_, ResponseRow>(&format!(
        "SELECT {RESPONSE_COLUMNS} FROM {RESPONSE_FROM} WHERE r.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Responses to one quiz; `only_user` narrows to a single respondent.
pub async fn list_responses(
    db: &PgPool,
    quiz_id: Uuid,
    only_user: Option<Uuid>,
    params: &ListParams,
) -> AppResult<Page<ResponseRow>> {
    let mut filters = vec![Filter::Id("r.quiz_id", quiz_id)];
    if let Some(user_id) = only_user {
        filters.push(Filter::Id("r.user_id", user_id));
    }
    fetch_page(db, &RESPONSES, &filters, params).await
}

/// (responses, mean score) across every quiz in the organization.
pub async fn organization_response_stats(db: &PgPool, organization_id: Uuid) -> sqlx::Result<(i64, Option<f64>)> {
    sqlx::query_as::<_, (i64, Option<f64>)>(
        r#"
        SELECT COUNT(r.id), AVG(r.score)
          FROM quiz_responses r
          JOIN quizzes q ON q.id = r.quiz_id
         WHERE q.organization_id = $1
        "#,
    )
    .bind(organization_id)
    .fetch_one(db)
    .await
}
