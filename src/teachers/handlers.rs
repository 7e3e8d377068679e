use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{clean_tags, CreateTeacherRequest, UpdateTeacherRequest};
use super::repo;
use super::repo_types::Teacher;
use crate::{
    access::{authorize_org, authorize_record, with_scoped_permission, Action, Owned, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError},
    people::provision,
    query::{ListParams, Page},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/:org_id/teachers",
            get(list_teachers).post(create_teacher),
        )
        .route(
            "/teachers/:id",
            get(get_teacher).patch(update_teacher).delete(delete_teacher),
        )
}

#[instrument(skip(state))]
pub async fn list_teachers(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Teacher>> {
    let params = params.clamped(state.config.max_items_per_page);
    let page = with_scoped_permission(
        state.access.as_ref(),
        session.user_id,
        org_id,
        Resource::Teacher,
        Action::Read,
        |_| repo::list(&state.db, org_id, &params),
    )
    .await?;
    ok(page)
}

#[instrument(skip(state, body))]
pub async fn create_teacher(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateTeacherRequest>,
) -> ApiResult<Teacher> {
    authorize_org(&state, session.user_id, org_id, Resource::Teacher, Action::Create).await?;

    let subjects = clean_tags(body.subjects);
    let certifications = clean_tags(body.certifications);

    let mut tx = state.db.begin().await?;
    let user_id = provision::provision_tx(&mut tx, org_id, &body.person).await?;
    let id = repo::insert_tx(&mut tx, org_id, user_id, &subjects, &certifications)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::conflict("User is already a teacher in this organization"),
            other => other,
        })?;
    tx.commit().await?;

    info!(teacher_id = %id, organization_id = %org_id, "teacher created");
    let teacher = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Teacher"))?;
    ok(teacher)
}

#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Teacher> {
    authorize_record(&state, session.user_id, Owned::Teacher, id, Resource::Teacher, Action::Read).await?;
    let teacher = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Teacher"))?;
    ok(teacher)
}

#[instrument(skip(state, body))]
pub async fn update_teacher(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTeacherRequest>,
) -> ApiResult<Teacher> {
    let (org_id, _) =
        authorize_record(&state, session.user_id, Owned::Teacher, id, Resource::Teacher, Action::Update).await?;

    let subjects = body.subjects.map(clean_tags);
    let certifications = body.certifications.map(clean_tags);

    let mut tx = state.db.begin().await?;
    let user_id = repo::update_tx(&mut tx, id, subjects.as_deref(), certifications.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("Teacher"))?;
    if let Some(name) = &body.name {
        provision::rename_tx(&mut tx, org_id, user_id, name).await?;
    }
    tx.commit().await?;

    info!(teacher_id = %id, "teacher updated");
    let teacher = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Teacher"))?;
    ok(teacher)
}

#[instrument(skip(state))]
pub async fn delete_teacher(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Teacher, id, Resource::Teacher, Action::Delete).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Teacher"));
    }
    info!(teacher_id = %id, "teacher deleted");
    ok(id)
}
