use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateClassroomRequest, EnrollRequest, EnrollResponse, UpdateClassroomRequest};
use super::repo::{self, NewClassroom};
use super::repo_types::Classroom;
use super::services;
use crate::{
    access::{authorize_org, authorize_record, owning_organization, with_scoped_permission, Action, Owned, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError, AppResult},
    query::{ListParams, Page},
    state::AppState,
    students::{repo as students_repo, repo_types::Student},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/:org_id/classrooms",
            get(list_classrooms).post(create_classroom),
        )
        .route(
            "/classrooms/:id",
            get(get_classroom).patch(update_classroom).delete(delete_classroom),
        )
        .route("/classrooms/:id/students", get(list_students).post(enroll_students))
        .route("/classrooms/:id/students/:student_id", delete(unenroll_student))
}

async fn ensure_teacher_in(state: &AppState, organization_id: Uuid, teacher_id: Uuid) -> AppResult<()> {
    let teacher_org = owning_organization(&state.db, Owned::Teacher, teacher_id).await?;
    if teacher_org != organization_id {
        warn!(%teacher_id, %organization_id, "teacher from another organization");
        return Err(AppError::validation("Teacher belongs to a different organization"));
    }
    Ok(())
}

async fn load(state: &AppState, id: Uuid) -> AppResult<Classroom> {
    repo::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Classroom"))
}

#[instrument(skip(state))]
pub async fn list_classrooms(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Classroom>> {
    let params = params.clamped(state.config.max_items_per_page);
    let page = with_scoped_permission(
        state.access.as_ref(),
        session.user_id,
        org_id,
        Resource::Classroom,
        Action::Read,
        |_| repo::list(&state.db, org_id, &params),
    )
    .await?;
    ok(page)
}

#[instrument(skip(state, body))]
pub async fn create_classroom(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateClassroomRequest>,
) -> ApiResult<Classroom> {
    authorize_org(&state, session.user_id, org_id, Resource::Classroom, Action::Create).await?;

    let name = services::check_name(&body.name)?;
    services::check_capacity(body.capacity)?;
    if let Some(teacher_id) = body.teacher_id {
        ensure_teacher_in(&state, org_id, teacher_id).await?;
    }

    let id = repo::insert(
        &state.db,
        NewClassroom {
            organization_id: org_id,
            teacher_id: body.teacher_id,
            name: &name,
            grade_level: body.grade_level.trim(),
            subject: body.subject.trim(),
            capacity: body.capacity,
            room: body.room.as_deref().map(str::trim).filter(|r| !r.is_empty()),
        },
    )
    .await?;

    info!(classroom_id = %id, organization_id = %org_id, "classroom created");
    ok(load(&state, id).await?)
}

#[instrument(skip(state))]
pub async fn get_classroom(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Classroom> {
    authorize_record(&state, session.user_id, Owned::Classroom, id, Resource::Classroom, Action::Read).await?;
    ok(load(&state, id).await?)
}

#[instrument(skip(state, body))]
pub async fn update_classroom(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateClassroomRequest>,
) -> ApiResult<Classroom> {
    let (org_id, _) =
        authorize_record(&state, session.user_id, Owned::Classroom, id, Resource::Classroom, Action::Update).await?;

    let name = body.name.as_deref().map(services::check_name).transpose()?;
    services::check_capacity(body.capacity)?;
    if let Some(capacity) = body.capacity {
        let enrolled = repo::enrolled_count(&state.db, id).await?;
        if enrolled > i64::from(capacity) {
            return Err(AppError::validation("Capacity is below current enrollment"));
        }
    }
    if let Some(Some(teacher_id)) = body.teacher_id {
        ensure_teacher_in(&state, org_id, teacher_id).await?;
    }

    if !repo::update(&state.db, id, name.as_deref(), &body).await? {
        return Err(AppError::not_found("Classroom"));
    }
    info!(classroom_id = %id, "classroom updated");
    ok(load(&state, id).await?)
}

#[instrument(skip(state))]
pub async fn delete_classroom(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Classroom, id, Resource::Classroom, Action::Delete).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Classroom"));
    }
    info!(classroom_id = %id, "classroom deleted");
    ok(id)
}

#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Student>> {
    authorize_record(&state, session.user_id, Owned::Classroom, id, Resource::Classroom, Action::Read).await?;
    ok(students_repo::list_for_classroom(&state.db, id).await?)
}

#[instrument(skip(state, body))]
pub async fn enroll_students(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<EnrollRequest>,
) -> ApiResult<EnrollResponse> {
    authorize_record(&state, session.user_id, Owned::Classroom, id, Resource::Classroom, Action::Update).await?;

    let student_ids = services::distinct_ids(&body.student_ids);
    if student_ids.is_empty() {
        return Err(AppError::validation("No students to enroll"));
    }

    let mut tx = state.db.begin().await?;
    let classroom = repo::lock_for_enrollment_tx(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("Classroom"))?;

    let in_org = repo::count_students_in_org_tx(&mut tx, classroom.organization_id, &student_ids).await?;
    if in_org != student_ids.len() as i64 {
        warn!(classroom_id = %id, "enrollment references students outside the organization");
        return Err(AppError::validation("Every student must belong to the classroom's organization"));
    }

    let (already, enrolled) = repo::enrollment_counts_tx(&mut tx, id, &student_ids).await?;
    services::check_room_for(classroom.capacity, enrolled, student_ids.len() as i64 - already)?;

    let added = repo::enroll_tx(&mut tx, id, &student_ids).await?;
    tx.commit().await?;

    info!(classroom_id = %id, added, "students enrolled");
    let students = students_repo::list_for_classroom(&state.db, id).await?;
    ok(EnrollResponse {
        enrolled: added,
        students,
    })
}

#[instrument(skip(state))]
pub async fn unenroll_student(
    State(state): State<AppState>,
    session: Session,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Classroom, id, Resource::Classroom, Action::Update).await?;
    if !repo::unenroll(&state.db, id, student_id).await? {
        return Err(AppError::not_found("Enrollment"));
    }
    info!(classroom_id = %id, %student_id, "student unenrolled");
    ok(student_id)
}
