use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Member, MemberRow};
use crate::access::MemberRole;
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

static MEMBERS: ListSpec = ListSpec {
    columns: "m.id, m.organization_id, m.user_id, m.role, m.created_at, \
              u.name AS user_name, u.email AS user_email",
    from: "members m JOIN users u ON u.id = m.user_id",
    search_columns: &["u.name", "u.email"],
    sort_columns: &[
        ("name", "u.name"),
        ("email", "u.email"),
        ("role", "m.role"),
        ("createdAt", "m.created_at"),
    ],
    default_sort: ("m.created_at", SortDirection::Desc),
    tie_breaker: "m.id",
};

pub async fn list(db: &PgPool, organization_id: Uuid, params: &ListParams) -> AppResult<Page<MemberRow>> {
    fetch_page(db, &MEMBERS, &[Filter::Id("m.organization_id", organization_id)], params).await
}

/// Inserts the membership unless one already exists; returns whether a row
/// was created.
pub async fn upsert_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
) -> sqlx::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO members (organization_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (organization_id, user_id) DO NOTHING
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(role.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn get_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> sqlx::Result<Option<Member>> {
    sqlx::query_as::<_, Member>(
        r#"SELECT id, organization_id, user_id, role, created_at FROM members WHERE id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn is_member_by_email_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    email: &str,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM members m JOIN users u ON u.id = m.user_id
             WHERE m.organization_id = $1 AND u.email = $2
        )
        "#,
    )
    .bind(organization_id)
    .bind(email)
    .fetch_one(&mut **tx)
    .await
}

/// Locks the organization's owner rows in id order and returns how many
/// there are. Concurrent owner changes in the same organization serialize here.
pub async fn lock_owners_tx(tx: &mut Transaction<'_, Postgres>, organization_id: Uuid) -> sqlx::Result<usize> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id FROM members
         WHERE organization_id = $1 AND role = 'owner'
         ORDER BY id
           FOR UPDATE
        "#,
    )
    .bind(organization_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(ids.len())
}

pub async fn count(db: &PgPool, organization_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM members WHERE organization_id = $1"#)
        .bind(organization_id)
        .fetch_one(db)
        .await
}

pub async fn set_role_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    role: MemberRole,
) -> sqlx::Result<Option<Member>> {
    sqlx::query_as::<_, Member>(
        r#"
        UPDATE members SET role = $2 WHERE id = $1
        RETURNING id, organization_id, user_id, role, created_at
        "#,
    )
    .bind(id)
    .bind(role.as_str())
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM members WHERE id = $1"#)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected() > 0)
}
