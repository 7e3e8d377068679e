use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateGradeRequest, GradeSummary, UpdateGradeRequest};
use super::repo::{self, NewGrade};
use super::repo_types::Grade;
use super::services;
use crate::{
    access::{authorize_record, Action, Owned, Resource},
    auth::Session,
    classrooms::repo as classrooms_repo,
    error::{ok, ApiResult, AppError, AppResult},
    query::{ListParams, Page},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/classrooms/:id/grades", get(list_grades).post(create_grade))
        .route("/grades/:id", patch(update_grade).delete(delete_grade))
        .route("/students/:id/grade-summary", get(grade_summary))
}

fn duplicate(e: sqlx::Error) -> AppError {
    match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::conflict("A grade already exists for this student, subject and grading period")
        }
        other => other,
    }
}

fn optional_required(field: &str, value: Option<&str>) -> AppResult<Option<String>> {
    value.map(|v| services::required(field, v)).transpose()
}

#[instrument(skip(state))]
pub async fn list_grades(
    State(state): State<AppState>,
    session: Session,
    Path(classroom_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Grade>> {
    authorize_record(&state, session.user_id, Owned::Classroom, classroom_id, Resource::Grade, Action::Read).await?;
    let params = params.clamped(state.config.max_items_per_page);
    ok(repo::list(&state.db, classroom_id, &params).await?)
}

#[instrument(skip(state, body))]
pub async fn create_grade(
    State(state): State<AppState>,
    session: Session,
    Path(classroom_id): Path<Uuid>,
    Json(body): Json<CreateGradeRequest>,
) -> ApiResult<Grade> {
    authorize_record(&state, session.user_id, Owned::Classroom, classroom_id, Resource::Grade, Action::Create)
        .await?;

    let subject = services::required("Subject", &body.subject)?;
    let grading_period = services::required("Grading period", &body.grading_period)?;
    let value = services::required("Value", &body.value)?;

    if !classrooms_repo::is_enrolled(&state.db, classroom_id, body.student_id).await? {
        warn!(%classroom_id, student_id = %body.student_id, "grade for student outside the classroom");
        return Err(AppError::validation("Student is not enrolled in this classroom"));
    }

    let id = repo::insert(
        &state.db,
        NewGrade {
            student_id: body.student_id,
            classroom_id,
            subject: &subject,
            grading_period: &grading_period,
            value: &value,
            comments: body.comments.as_deref().map(str::trim),
            created_by: session.user_id,
        },
    )
    .await
    .map_err(duplicate)?;

    info!(grade_id = %id, %classroom_id, student_id = %body.student_id, "grade recorded");
    let grade = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Grade"))?;
    ok(grade)
}

#[instrument(skip(state, body))]
pub async fn update_grade(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGradeRequest>,
) -> ApiResult<Grade> {
    authorize_record(&state, session.user_id, Owned::Grade, id, Resource::Grade, Action::Update).await?;

    let subject = optional_required("Subject", body.subject.as_deref())?;
    let grading_period = optional_required("Grading period", body.grading_period.as_deref())?;
    let value = optional_required("Value", body.value.as_deref())?;

    let updated = repo::update(
        &state.db,
        id,
        subject.as_deref(),
        grading_period.as_deref(),
        value.as_deref(),
        body.comments.as_deref().map(str::trim),
    )
    .await
    .map_err(duplicate)?;
    if !updated {
        return Err(AppError::not_found("Grade"));
    }

    info!(grade_id = %id, "grade updated");
    let grade = repo::get(&state.db, id).await?.ok_or_else(|| AppError::not_found("Grade"))?;
    ok(grade)
}

#[instrument(skip(state))]
pub async fn delete_grade(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Grade, id, Resource::Grade, Action::Delete).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Grade"));
    }
    info!(grade_id = %id, "grade deleted");
    ok(id)
}

#[instrument(skip(state))]
pub async fn grade_summary(
    State(state): State<AppState>,
    session: Session,
    Path(student_id): Path<Uuid>,
) -> ApiResult<GradeSummary> {
    authorize_record(&state, session.user_id, Owned::Student, student_id, Resource::Grade, Action::Read).await?;
    let rows = repo::values_for_student(&state.db, student_id).await?;
    let (subjects, overall_average) = services::summarize(&rows);
    ok(GradeSummary {
        student_id,
        subjects,
        overall_average,
    })
}
