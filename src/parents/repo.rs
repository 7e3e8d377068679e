use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::Parent;
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

const PARENT_COLUMNS: &str = "p.id, p.user_id, p.organization_id, u.name, u.email, \
                              p.relationship, p.occupation, p.created_at";

static PARENTS: ListSpec = ListSpec {
    columns: PARENT_COLUMNS,
    from: "parents p JOIN users u ON u.id = p.user_id",
    search_columns: &["u.name", "u.email"],
    sort_columns: &[
        ("name", "u.name"),
        ("email", "u.email"),
        ("relationship", "p.relationship"),
        ("createdAt", "p.created_at"),
    ],
    default_sort: ("p.created_at", SortDirection::Desc),
    tie_breaker: "p.id",
};

pub async fn list(db: &PgPool, organization_id: Uuid, params: &ListParams) -> AppResult<Page<Parent>> {
    fetch_page(db, &PARENTS, &[Filter::Id("p.organization_id", organization_id)], params).await
}

pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Parent>> {
    sqlx::query_as::<_, Parent>(&format!(
        "SELECT {PARENT_COLUMNS} FROM parents p JOIN users u ON u.id = p.user_id WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn list_for_student(db: &PgPool, student_id: Uuid) -> sqlx::Result<Vec<Parent>> {
    sqlx::query_as::<_, Parent>(&format!(
        "SELECT {PARENT_COLUMNS} \
           FROM student_parents sp \
           JOIN parents p ON p.id = sp.parent_id \
           JOIN users u ON u.id = p.user_id \
          WHERE sp.student_id = $1 \
          ORDER BY u.name ASC, p.id ASC"
    ))
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    user_id: Uuid,
    relationship: &str,
    occupation: Option<&str>,
) -> sqlx::Result<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO parents (organization_id, user_id, relationship, occupation)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(relationship)
    .bind(occupation)
    .fetch_one(&mut **tx)
    .await
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    relationship: Option<&str>,
    occupation: Option<&str>,
) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE parents
           SET relationship = COALESCE($2, relationship),
               occupation = COALESCE($3, occupation)
         WHERE id = $1
        RETURNING user_id
        "#,
    )
    .bind(id)
    .bind(relationship)
    .bind(occupation)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM parents WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn count(db: &PgPool, organization_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM parents WHERE organization_id = $1"#)
        .bind(organization_id)
        .fetch_one(db)
        .await
}
