use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateStudentRequest, LinkParentRequest, UpdateStudentRequest};
use super::repo;
use super::repo_types::Student;
use crate::{
    access::{authorize_org, authorize_record, owning_organization, with_scoped_permission, Action, Owned, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError},
    parents::{repo as parents_repo, repo_types::Parent},
    people::provision,
    query::{ListParams, Page},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/:org_id/students",
            get(list_students).post(create_student),
        )
        .route(
            "/students/:id",
            get(get_student).patch(update_student).delete(delete_student),
        )
        .route("/students/:id/parents", get(list_parents).post(link_parent))
        .route("/students/:id/parents/:parent_id", delete(unlink_parent))
}

#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Student>> {
    let params = params.clamped(state.config.max_items_per_page);
    let page = with_scoped_permission(
        state.access.as_ref(),
        session.user_id,
        org_id,
        Resource::Student,
        Action::Read,
        |_| repo::list(&state.db, org_id, &params),
    )
    .await?;
    ok(page)
}

#[instrument(skip(state, body))]
pub async fn create_student(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateStudentRequest>,
) -> ApiResult<Student> {
    authorize_org(&state, session.user_id, org_id, Resource::Student, Action::Create).await?;

    let medical_info = body.medical_info.as_deref().map(str::trim).filter(|m| !m.is_empty());

    let mut tx = state.db.begin().await?;
    let user_id = provision::provision_tx(&mut tx, org_id, &body.person).await?;
    let id = repo::insert_tx(&mut tx, org_id, user_id, body.grade_level.trim(), medical_info)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::conflict("User is already a student in this organization"),
            other => other,
        })?;
    tx.commit().await?;

    info!(student_id = %id, organization_id = %org_id, "student created");
    let student = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Student"))?;
    ok(student)
}

#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Student> {
    authorize_record(&state, session.user_id, Owned::Student, id, Resource::Student, Action::Read).await?;
    let student = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Student"))?;
    ok(student)
}

#[instrument(skip(state, body))]
pub async fn update_student(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStudentRequest>,
) -> ApiResult<Student> {
    let (org_id, _) =
        authorize_record(&state, session.user_id, Owned::Student, id, Resource::Student, Action::Update).await?;

    let mut tx = state.db.begin().await?;
    let user_id = repo::update_tx(
        &mut tx,
        id,
        body.grade_level.as_deref().map(str::trim),
        body.medical_info.as_deref().map(str::trim),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Student"))?;
    if let Some(name) = &body.name {
        provision::rename_tx(&mut tx, org_id, user_id, name).await?;
    }
    tx.commit().await?;

    info!(student_id = %id, "student updated");
    let student = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Student"))?;
    ok(student)
}

#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Student, id, Resource::Student, Action::Delete).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Student"));
    }
    info!(student_id = %id, "student deleted");
    ok(id)
}

#[instrument(skip(state))]
pub async fn list_parents(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Parent>> {
    authorize_record(&state, session.user_id, Owned::Student, id, Resource::Student, Action::Read).await?;
    ok(parents_repo::list_for_student(&state.db, id).await?)
}

#[instrument(skip(state, body))]
pub async fn link_parent(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<LinkParentRequest>,
) -> ApiResult<Vec<Parent>> {
    let (org_id, _) =
        authorize_record(&state, session.user_id, Owned::Student, id, Resource::Student, Action::Update).await?;

    let parent_org = owning_organization(&state.db, Owned::Parent, body.parent_id).await?;
    if parent_org != org_id {
        warn!(student_id = %id, parent_id = %body.parent_id, "cross-organization parent link rejected");
        return Err(AppError::validation("Parent belongs to a different organization"));
    }

    if repo::link_parent(&state.db, id, body.parent_id).await? {
        info!(student_id = %id, parent_id = %body.parent_id, "parent linked");
    }
    ok(parents_repo::list_for_student(&state.db, id).await?)
}

#[instrument(skip(state))]
pub async fn unlink_parent(
    State(state): State<AppState>,
    session: Session,
    Path((id, parent_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Student, id, Resource::Student, Action::Update).await?;
    if !repo::unlink_parent(&state.db, id, parent_id).await? {
        return Err(AppError::not_found("Parent link"));
    }
    info!(student_id = %id, %parent_id, "parent unlinked");
    ok(parent_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MemberRole;
    use crate::testing;

    fn rename(name: &str) -> Json<UpdateStudentRequest> {
        Json(UpdateStudentRequest { name: Some(name.into()), grade_level: None, medical_info: None })
    }

    async fn user_name(state: &AppState, user_id: Uuid) -> String {
        sqlx::query_scalar("SELECT name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&state.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn admin_cannot_rename_an_account_shared_with_another_organization() {
        let Some(state) = testing::pg_state().await else { return };
        let (ours, theirs) = (testing::organization(&state.db).await, testing::organization(&state.db).await);
        let admin = testing::admin(&state.db, ours).await;

        let account = testing::user(&state.db, "Kept Name").await;
        testing::member(&state.db, theirs, account.user_id, MemberRole::Admin).await;
        let student = testing::student_for(&state.db, ours, account.user_id).await;

        let res = update_student(State(state.clone()), admin, Path(student), rename("Renamed")).await;
        assert!(matches!(res, Err(AppError::PermissionDenied(_))));
        assert_eq!(user_name(&state, account.user_id).await, "Kept Name");
    }

    #[tokio::test]
    async fn admin_renames_an_account_only_their_organization_manages() {
        let Some(state) = testing::pg_state().await else { return };
        let org = testing::organization(&state.db).await;
        let admin = testing::admin(&state.db, org).await;
        let account = testing::user(&state.db, "Old Name").await;
        let student = testing::student_for(&state.db, org, account.user_id).await;

        update_student(State(state.clone()), admin, Path(student), rename(" New Name ")).await.unwrap();
        assert_eq!(user_name(&state, account.user_id).await, "New Name");
    }
}
