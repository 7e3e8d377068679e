use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateOrganizationRequest, UpdateOrganizationRequest};
use super::repo_types::{Organization, OrganizationWithRole};
use super::{repo, services};
use crate::{
    access::{authorize_org, Action, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations", get(list_my_organizations).post(create_organization))
        .route(
            "/organizations/:org_id",
            get(get_organization)
                .patch(update_organization)
                .delete(delete_organization),
        )
}

#[instrument(skip(state))]
pub async fn list_my_organizations(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Vec<OrganizationWithRole>> {
    let orgs = if session.is_super_admin() {
        repo::list_all(&state.db, session.user_id).await?
    } else {
        repo::list_for_user(&state.db, session.user_id).await?
    };
    ok(orgs)
}

#[instrument(skip(state, body))]
pub async fn create_organization(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateOrganizationRequest>,
) -> ApiResult<Organization> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Organization name is required"));
    }
    let slug = match body.slug.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => services::slugify(name),
    };
    services::validate_slug(&slug)?;

    let org = services::create_with_owner(&state, session.user_id, name, &slug)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => AppError::conflict("Slug already in use"),
            other => other,
        })?;
    ok(org)
}

#[instrument(skip(state))]
pub async fn get_organization(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Organization> {
    authorize_org(&state, session.user_id, org_id, Resource::Organization, Action::Read).await?;
    let org = repo::get(&state.db, org_id)
        .await?
        .ok_or_else(|| AppError::not_found("Organization"))?;
    ok(org)
}

#[instrument(skip(state, body))]
pub async fn update_organization(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Json(body): Json<UpdateOrganizationRequest>,
) -> ApiResult<Organization> {
    authorize_org(&state, session.user_id, org_id, Resource::Organization, Action::Update).await?;

    let name = body.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(AppError::validation("Organization name is required"));
    }
    let slug = body.slug.as_deref().map(str::trim);
    if let Some(s) = slug {
        services::validate_slug(s)?;
    }

    let org = repo::update(&state.db, org_id, name, slug)
        .await?
        .ok_or_else(|| AppError::not_found("Organization"))?;
    info!(organization_id = %org_id, "organization updated");
    ok(org)
}

#[instrument(skip(state))]
pub async fn delete_organization(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_org(&state, session.user_id, org_id, Resource::Organization, Action::Delete).await?;
    if !repo::delete(&state.db, org_id).await? {
        return Err(AppError::not_found("Organization"));
    }
    info!(organization_id = %org_id, user_id = %session.user_id, "organization deleted");
    ok(org_id)
}
