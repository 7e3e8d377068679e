use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Organization, OrganizationWithRole};

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    slug: &str,
) -> sqlx::Result<Organization> {
    sqlx::query_as::<_, Organization>(
        r#"
        INSERT INTO organizations (name, slug)
        VALUES ($1, $2)
        RETURNING id, name, slug, created_at
        "#,
    )
    .bind(name)
    .bind(slug)
    .fetch_one(&mut **tx)
    .await
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<OrganizationWithRole>> {
    sqlx::query_as::<_, OrganizationWithRole>(
        r#"
        SELECT o.id, o.name, o.slug, o.created_at, m.role
          FROM organizations o
          JOIN members m ON m.organization_id = o.id
         WHERE m.user_id = $1
         ORDER BY o.name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Every organization, with the caller's role where they hold one.
pub async fn list_all(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<OrganizationWithRole>> {
    sqlx::query_as::<_, OrganizationWithRole>(
        r#"
        SELECT o.id, o.name, o.slug, o.created_at, m.role
          FROM organizations o
          LEFT JOIN members m ON m.organization_id = o.id AND m.user_id = $1
         ORDER BY o.name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn get(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Organization>> {
    sqlx::query_as::<_, Organization>(
        r#"SELECT id, name, slug, created_at FROM organizations WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    name: Option<&str>,
    slug: Option<&str>,
) -> sqlx::Result<Option<Organization>> {
    sqlx::query_as::<_, Organization>(
        r#"
        UPDATE organizations
           SET name = COALESCE($2, name),
               slug = COALESCE($3, slug)
         WHERE id = $1
        RETURNING id, name, slug, created_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM organizations WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
