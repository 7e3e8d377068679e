use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateParentRequest, UpdateParentRequest};
use super::repo;
use super::repo_types::Parent;
use crate::{
    access::{authorize_org, authorize_record, with_scoped_permission, Action, Owned, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError},
    people::provision,
    query::{ListParams, Page},
    state::AppState,
    students::{repo as students_repo, repo_types::Student},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/:org_id/parents",
            get(list_parents).post(create_parent),
        )
        .route(
            "/parents/:id",
            get(get_parent).patch(update_parent).delete(delete_parent),
        )
        .route("/parents/:id/students", get(list_children))
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[instrument(skip(state))]
pub async fn list_parents(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Parent>> {
    let params = params.clamped(state.config.max_items_per_page);
    let page = with_scoped_permission(
        state.access.as_ref(),
        session.user_id,
        org_id,
        Resource::Parent,
        Action::Read,
        |_| repo::list(&state.db, org_id, &params),
    )
    .await?;
    ok(page)
}

#[instrument(skip(state, body))]
pub async fn create_parent(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateParentRequest>,
) -> ApiResult<Parent> {
    authorize_org(&state, session.user_id, org_id, Resource::Parent, Action::Create).await?;

    let mut tx = state.db.begin().await?;
    let user_id = provision::provision_tx(&mut tx, org_id, &body.person).await?;
    let id = repo::insert_tx(
        &mut tx,
        org_id,
        user_id,
        body.relationship.trim(),
        trimmed(body.occupation.as_deref()),
    )
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::conflict("User is already a parent in this organization"),
        other => other,
    })?;
    tx.commit().await?;

    info!(parent_id = %id, organization_id = %org_id, "parent created");
    let parent = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Parent"))?;
    ok(parent)
}

#[instrument(skip(state))]
pub async fn get_parent(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Parent> {
    authorize_record(&state, session.user_id, Owned::Parent, id, Resource::Parent, Action::Read).await?;
    let parent = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Parent"))?;
    ok(parent)
}

#[instrument(skip(state, body))]
pub async fn update_parent(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateParentRequest>,
) -> ApiResult<Parent> {
    let (org_id, _) =
        authorize_record(&state, session.user_id, Owned::Parent, id, Resource::Parent, Action::Update).await?;

    let mut tx = state.db.begin().await?;
    let user_id = repo::update_tx(
        &mut tx,
        id,
        body.relationship.as_deref().map(str::trim),
        body.occupation.as_deref().map(str::trim),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Parent"))?;
    if let Some(name) = &body.name {
        provision::rename_tx(&mut tx, org_id, user_id, name).await?;
    }
    tx.commit().await?;

    info!(parent_id = %id, "parent updated");
    let parent = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Parent"))?;
    ok(parent)
}

#[instrument(skip(state))]
pub async fn delete_parent(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Parent, id, Resource::Parent, Action::Delete).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Parent"));
    }
    info!(parent_id = %id, "parent deleted");
    ok(id)
}

#[instrument(skip(state))]
pub async fn list_children(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Student>> {
    authorize_record(&state, session.user_id, Owned::Parent, id, Resource::Parent, Action::Read).await?;
    ok(students_repo::list_for_parent(&state.db, id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_text_is_dropped() {
        assert_eq!(trimmed(Some("  ")), None);
        assert_eq!(trimmed(Some(" Nurse ")), Some("Nurse"));
        assert_eq!(trimmed(None), None);
    }
}
