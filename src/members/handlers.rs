use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::UpdateMemberRoleRequest;
use super::repo_types::{Member, MemberRow};
use super::{repo, services};
use crate::{
    access::{authorize_record, with_scoped_permission, Action, MemberRole, Owned, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError},
    query::{ListParams, Page},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations/:org_id/members", get(list_members))
        .route("/members/:id", patch(update_member_role).delete(remove_member))
}

#[instrument(skip(state))]
pub async fn list_members(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<MemberRow>> {
    let params = params.clamped(state.config.max_items_per_page);
    let page = with_scoped_permission(
        state.access.as_ref(),
        session.user_id,
        org_id,
        Resource::Member,
        Action::Read,
        |_| repo::list(&state.db, org_id, &params),
    )
    .await?;
    ok(page)
}

async fn load_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(Member, MemberRole), AppError> {
    let member = repo::get_tx(tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("Member"))?;
    let role = MemberRole::parse(&member.role)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown member role {}", member.role)))?;
    Ok((member, role))
}

#[instrument(skip(state, body))]
pub async fn update_member_role(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Member> {
    let (org_id, grant) =
        authorize_record(&state, session.user_id, Owned::Member, id, Resource::Member, Action::Update).await?;

    let mut tx = state.db.begin().await?;
    let owners = repo::lock_owners_tx(&mut tx, org_id).await?;
    let (_, current) = load_tx(&mut tx, id).await?;
    services::check_role_change(&grant, current, body.role, owners)?;

    let member = repo::set_role_tx(&mut tx, id, body.role)
        .await?
        .ok_or_else(|| AppError::not_found("Member"))?;
    tx.commit().await?;

    info!(member_id = %id, organization_id = %org_id, role = body.role.as_str(), "member role updated");
    ok(member)
}

#[instrument(skip(state))]
pub async fn remove_member(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    let (org_id, grant) =
        authorize_record(&state, session.user_id, Owned::Member, id, Resource::Member, Action::Delete).await?;

    let mut tx = state.db.begin().await?;
    let owners = repo::lock_owners_tx(&mut tx, org_id).await?;
    let (_, current) = load_tx(&mut tx, id).await?;
    services::check_removal(&grant, current, owners)?;

    if !repo::delete_tx(&mut tx, id).await? {
        return Err(AppError::not_found("Member"));
    }
    tx.commit().await?;

    info!(member_id = %id, organization_id = %org_id, "member removed");
    ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn concurrent_owner_demotions_keep_an_owner() {
        let Some(state) = testing::pg_state().await else { return };
        for _ in 0..5 {
            let org = testing::organization(&state.db).await;
            let a = testing::user(&state.db, "Owner A").await;
            let b = testing::user(&state.db, "Owner B").await;
            let ma = testing::member(&state.db, org, a.user_id, MemberRole::Owner).await;
            let mb = testing::member(&state.db, org, b.user_id, MemberRole::Owner).await;

            let demote = |session: Session, id: Uuid| {
                update_member_role(
                    State(state.clone()),
                    session,
                    Path(id),
                    Json(UpdateMemberRoleRequest { role: MemberRole::Admin }),
                )
            };
            let (ra, rb) = tokio::join!(demote(a, ma), demote(b, mb));

            assert_eq!(usize::from(ra.is_ok()) + usize::from(rb.is_ok()), 1);
            assert_eq!(testing::owner_count(&state.db, org).await, 1);
        }
    }

    #[tokio::test]
    async fn concurrent_owner_removals_keep_an_owner() {
        let Some(state) = testing::pg_state().await else { return };
        for _ in 0..5 {
            let org = testing::organization(&state.db).await;
            let a = testing::user(&state.db, "Owner A").await;
            let b = testing::user(&state.db, "Owner B").await;
            let ma = testing::member(&state.db, org, a.user_id, MemberRole::Owner).await;
            let mb = testing::member(&state.db, org, b.user_id, MemberRole::Owner).await;

            let (ra, rb) = tokio::join!(
                remove_member(State(state.clone()), a, Path(ma)),
                remove_member(State(state.clone()), b, Path(mb)),
            );

            assert!(matches!((&ra, &rb), (Ok(_), Err(AppError::Validation(_))) | (Err(AppError::Validation(_)), Ok(_))));
            assert_eq!(testing::owner_count(&state.db, org).await, 1);
        }
    }
}
