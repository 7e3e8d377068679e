use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Invitation, InvitationRow};
use crate::error::AppResult;
use crate::query::{fetch_page, Filter, ListParams, ListSpec, Page, SortDirection};

const INVITATION_COLUMNS: &str =
    "id, organization_id, email, role, inviter_id, token, status, expires_at, created_at";

static INVITATIONS: ListSpec = ListSpec {
    columns: "i.id, i.organization_id, o.name AS organization_name, i.email, i.role, \
              u.name AS inviter_name, i.status, i.expires_at, i.created_at",
    from: "invitations i \
           JOIN organizations o ON o.id = i.organization_id \
           JOIN users u ON u.id = i.inviter_id",
    search_columns: &["i.email", "u.name"],
    sort_columns: &[
        ("email", "i.email"),
        ("role", "i.role"),
        ("status", "i.status"),
        ("expiresAt", "i.expires_at"),
        ("createdAt", "i.created_at"),
    ],
    default_sort: ("i.created_at", SortDirection::Desc),
    tie_breaker: "i.id",
};

pub async fn list(db: &PgPool, organization_id: Uuid, params: &ListParams) -> AppResult<Page<InvitationRow>> {
    fetch_page(db, &INVITATIONS, &[Filter::Id("i.organization_id", organization_id)], params).await
}

pub async fn list_pending_for_email(db: &PgPool, email: &str) -> sqlx::Result<Vec<InvitationRow>> {
    sqlx::query_as::<_, InvitationRow>(
        r#"
        SELECT i.id, i.organization_id, o.name AS organization_name, i.email, i.role,
               u.name AS inviter_name, i.status, i.expires_at, i.created_at
          FROM invitations i
          JOIN organizations o ON o.id = i.organization_id
          JOIN users u ON u.id = i.inviter_id
         WHERE lower(i.email) = lower($1)
           AND i.status = 'pending'
           AND i.expires_at > now()
         ORDER BY i.created_at DESC
        "#,
    )
    .bind(email)
    .fetch_all(db)
    .await
}

pub async fn find_pending_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    email: &str,
) -> sqlx::Result<Option<Invitation>> {
    sqlx::query_as::<_, Invitation>(&format!(
        "SELECT {INVITATION_COLUMNS} FROM invitations \
         WHERE organization_id = $1 AND lower(email) = lower($2) AND status = 'pending' \
         FOR UPDATE"
    ))
    .bind(organization_id)
    .bind(email)
    .fetch_optional(&mut **tx)
    .await
}

/// Returns `None` when a pending invitation for the email already exists,
/// including one committed by a concurrent request.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    email: &str,
    role: &str,
    inviter_id: Uuid,
    token: &str,
    expires_at: OffsetDateTime,
) -> sqlx::Result<Option<Invitation>> {
    sqlx::query_as::<_, Invitation>(&format!(
        "INSERT INTO invitations (organization_id, email, role, inviter_id, token, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (organization_id, lower(email)) WHERE status = 'pending' DO NOTHING \
         RETURNING {INVITATION_COLUMNS}"
    ))
    .bind(organization_id)
    .bind(email)
    .bind(role)
    .bind(inviter_id)
    .bind(token)
    .bind(expires_at)
    .fetch_optional(&mut **tx)
    .await
}

/// Re-issues an expired pending invitation in place.
pub async fn renew_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    role: &str,
    inviter_id: Uuid,
    token: &str,
    expires_at: OffsetDateTime,
) -> sqlx::Result<Invitation> {
    sqlx::query_as::<_, Invitation>(&format!(
        "UPDATE invitations \
            SET role = $2, inviter_id = $3, token = $4, expires_at = $5, created_at = now() \
          WHERE id = $1 \
         RETURNING {INVITATION_COLUMNS}"
    ))
    .bind(id)
    .bind(role)
    .bind(inviter_id)
    .bind(token)
    .bind(expires_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_token_tx(
    tx: &mut Transaction<'_, Postgres>,
    token: &str,
) -> sqlx::Result<Option<Invitation>> {
    sqlx::query_as::<_, Invitation>(&format!(
        "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token = $1 FOR UPDATE"
    ))
    .bind(token)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn mark_accepted_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> sqlx::Result<()> {
    sqlx::query(r#"UPDATE invitations SET status = 'accepted' WHERE id = $1 AND status = 'pending'"#)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete_pending(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM invitations WHERE id = $1 AND status = 'pending'"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
