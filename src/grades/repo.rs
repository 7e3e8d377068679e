use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Grade, SubjectValue};
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

const GRADE_COLUMNS: &str = "g.id, g.student_id, u.name AS student_name, g.classroom_id, g.subject, \
                             g.grading_period, g.value, g.comments, g.created_by, g.created_at";
const GRADE_FROM: &str = "grades g JOIN students s ON s.id = g.student_id JOIN users u ON u.id = s.user_id";

static GRADES: ListSpec = ListSpec {
    columns: GRADE_COLUMNS,
    from: GRADE_FROM,
    search_columns: &["u.name", "g.subject"],
    sort_columns: &[
        ("subject", "g.subject"),
        ("period", "g.grading_period"),
        ("gradingPeriod", "g.grading_period"),
        ("studentName", "u.name"),
        ("createdAt", "g.created_at"),
    ],
    default_sort: ("g.created_at", SortDirection::Desc),
    tie_breaker: "g.id",
};

pub async fn list(db: &PgPool, classroom_id: Uuid, params: &ListParams) -> AppResult<Page<Grade>> {
    fetch_page(db, &GRADES, &[Filter::Id("g.classroom_id", classroom_id)], params).await
}

pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Grade>> {
    sqlx::query_as::<_, Grade>(&format!("SELECT {GRADE_COLUMNS} FROM {GRADE_FROM} WHERE g.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub struct NewGrade<'a> {
    pub student_id: Uuid,
    pub classroom_id: Uuid,
    pub subject: &'a str,
    pub grading_period: &'a str,
    pub value: &'a str,
    pub comments: Option<&'a str>,
    pub created_by: Uuid,
}

pub async fn insert(db: &PgPool, g: NewGrade<'_>) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO grades (student_id, classroom_id, subject, grading_period, value, comments, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(g.student_id)
    .bind(g.classroom_id)
    .bind(g.subject)
    .bind(g.grading_period)
    .bind(g.value)
    .bind(g.comments)
    .bind(g.created_by)
    .fetch_one(db)
    .await
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    subject: Option<&str>,
    grading_period: Option<&str>,
    value: Option<&str>,
    comments: Option<&str>,
) -> sqlx::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE grades
           SET subject = COALESCE($2, subject),
               grading_period = COALESCE($3, grading_period),
               value = COALESCE($4, value),
               comments = COALESCE($5, comments)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(subject)
    .bind(grading_period)
    .bind(value)
    .bind(comments)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM grades WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn values_for_student(db: &PgPool, student_id: Uuid) -> sqlx::Result<Vec<SubjectValue>> {
    sqlx::query_as::<_, SubjectValue>(
        r#"SELECT subject, value FROM grades WHERE student_id = $1 ORDER BY subject, created_at"#,
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}
