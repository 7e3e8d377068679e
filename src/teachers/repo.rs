use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::Teacher;
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

const SELECT_TEACHER: &str = "SELECT t.id, t.user_id, t.organization_id, u.name, u.email, \
                                     t.subjects, t.certifications, t.created_at \
                                FROM teachers t JOIN users u ON u.id = t.user_id";

static TEACHERS: ListSpec = ListSpec {
    columns: "t.id, t.user_id, t.organization_id, u.name, u.email, t.subjects, t.certifications, t.created_at",
    from: "teachers t JOIN users u ON u.id = t.user_id",
    search_columns: &["u.name", "u.email"],
    sort_columns: &[
        ("name", "u.name"),
        ("email", "u.email"),
        ("createdAt", "t.created_at"),
    ],
    default_sort: ("t.created_at", SortDirection::Desc),
    tie_breaker: "t.id",
};

pub async fn list(db: &PgPool, organization_id: Uuid, params: &ListParams) -> AppResult<Page<Teacher>> {
    fetch_page(db, &TEACHERS, &[Filter::Id("t.organization_id", organization_id)], params).await
}

pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Teacher>> {
    sqlx::query_as::<_, Teacher>(&format!("{SELECT_TEACHER} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    user_id: Uuid,
    subjects: &[String],
    certifications: &[String],
) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO teachers (organization_id, user_id, subjects, certifications)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(subjects)
    .bind(certifications)
    .fetch_one(&mut **tx)
    .await
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    subjects: Option<&[String]>,
    certifications: Option<&[String]>,
) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE teachers
           SET subjects = COALESCE($2, subjects),
               certifications = COALESCE($3, certifications)
         WHERE id = $1
        RETURNING user_id
        "#,
    )
    .bind(id)
    .bind(subjects)
    .bind(certifications)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM teachers WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn count(db: &PgPool, organization_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM teachers WHERE organization_id = $1"#)
        .bind(organization_id)
        .fetch_one(db)
        .await
}
