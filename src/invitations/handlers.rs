use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{AcceptInvitationRequest, AcceptInvitationResponse, InvitationView, InviteRequest, InviteResponse};
use super::{repo, services};
use crate::{
    access::{authorize_org, authorize_record, Action, MemberRole, Owned, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError},
    query::{ListParams, Page},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/:org_id/invitations",
            get(list_organization_invitations).post(invite_members),
        )
        .route("/invitations", get(list_my_invitations))
        .route("/invitations/accept", post(accept_invitation))
        .route("/invitations/:id", delete(revoke_invitation))
}

#[instrument(skip(state, body))]
pub async fn invite_members(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Json(body): Json<InviteRequest>,
) -> ApiResult<InviteResponse> {
    let grant = authorize_org(&state, session.user_id, org_id, Resource::Invitation, Action::Create).await?;
    if body.role == MemberRole::Owner && !grant.is_owner() {
        return Err(AppError::PermissionDenied("Only owners can invite owners".into()));
    }
    let emails = services::normalize_emails(&body.emails)?;
    let res = services::invite_many(&state, session.user_id, org_id, emails, body.role).await?;
    ok(res)
}

#[instrument(skip(state))]
pub async fn list_organization_invitations(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<InvitationView>> {
    authorize_org(&state, session.user_id, org_id, Resource::Invitation, Action::Read).await?;
    let params = params.clamped(state.config.max_items_per_page);
    let now = OffsetDateTime::now_utc();
    let page = repo::list(&state.db, org_id, &params).await?;
    ok(page.map(|row| InvitationView::from_row(row, now)))
}

#[instrument(skip(state))]
pub async fn list_my_invitations(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Vec<InvitationView>> {
    let now = OffsetDateTime::now_utc();
    let rows = repo::list_pending_for_email(&state.db, &session.email).await?;
    ok(rows.into_iter().map(|r| InvitationView::from_row(r, now)).collect())
}

#[instrument(skip(state, body))]
pub async fn accept_invitation(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AcceptInvitationRequest>,
) -> ApiResult<AcceptInvitationResponse> {
    let token = body.token.trim();
    if token.is_empty() {
        return Err(AppError::validation("Invitation token is required"));
    }
    ok(services::accept(&state, &session, token).await?)
}

#[instrument(skip(state))]
pub async fn revoke_invitation(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Invitation, id, Resource::Invitation, Action::Delete).await?;
    if !repo::delete_pending(&state.db, id).await? {
        return Err(AppError::conflict("Only pending invitations can be revoked"));
    }
    info!(invitation_id = %id, "invitation revoked");
    ok(id)
}
