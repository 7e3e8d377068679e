use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{BanRequest, SetRoleRequest, UserFilter};
use super::repo::{self, UserRow};
use super::services;
use crate::{
    access::require_super_admin,
    auth::{dto::PublicUser, repo_types::User, Session},
    error::{ok, ApiResult, AppError},
    query::{ListParams, Page},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/ban", post(ban_user))
        .route("/admin/users/:id/unban", post(unban_user))
        .route("/admin/users/:id/role", patch(set_role))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<UserFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<UserRow>> {
    require_super_admin(state.access.as_ref(), session.user_id).await?;
    let params = params.clamped(state.config.max_items_per_page);
    ok(repo::list_users(&state.db, &filter, &params).await?)
}

#[instrument(skip(state, body))]
pub async fn ban_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    body: Option<Json<BanRequest>>,
) -> ApiResult<PublicUser> {
    require_super_admin(state.access.as_ref(), session.user_id).await?;
    services::check_ban(session.user_id, id)?;

    let Json(body) = body.unwrap_or_default();
    let reason = services::ban_reason(body.reason.as_deref());
    let user = User::set_banned(&state.db, id, true, reason.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    info!(user_id = %id, by = %session.user_id, "user banned");
    ok(user.into())
}

#[instrument(skip(state))]
pub async fn unban_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<PublicUser> {
    require_super_admin(state.access.as_ref(), session.user_id).await?;
    let user = User::set_banned(&state.db, id, false, None)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    info!(user_id = %id, by = %session.user_id, "user unbanned");
    ok(user.into())
}

#[instrument(skip(state, body))]
pub async fn set_role(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> ApiResult<PublicUser> {
    require_super_admin(state.access.as_ref(), session.user_id).await?;
    services::check_role_change(session.user_id, id, body.role)?;

    let user = User::set_role(&state.db, id, body.role.as_str())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    info!(user_id = %id, role = body.role.as_str(), by = %session.user_id, "global role changed");
    ok(user.into())
}
