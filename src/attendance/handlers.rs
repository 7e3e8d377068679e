use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AttendanceSummary, MarkAttendanceRequest, OpenSessionRequest, SessionDetail};
use super::repo;
use super::repo_types::{AttendanceSession, SessionSummary};
use crate::{
    access::{authorize_record, Action, Owned, Resource},
    auth::Session,
    classrooms::services::distinct_ids,
    error::{ok, ApiResult, AppError},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/classrooms/:id/attendance-sessions",
            get(list_sessions).post(open_session),
        )
        .route("/attendance-sessions/:id", get(get_session))
        .route("/attendance-sessions/:id/records", put(mark_attendance))
        .route("/students/:id/attendance-summary", get(student_summary))
}

#[instrument(skip(state, body))]
pub async fn open_session(
    State(state): State<AppState>,
    session: Session,
    Path(classroom_id): Path<Uuid>,
    Json(body): Json<OpenSessionRequest>,
) -> ApiResult<AttendanceSession> {
    authorize_record(
        &state,
        session.user_id,
        Owned::Classroom,
        classroom_id,
        Resource::Attendance,
        Action::Create,
    )
    .await?;
    let s = repo::get_or_create_session(&state.db, classroom_id, body.date).await?;
    info!(session_id = %s.id, %classroom_id, date = %s.date, "attendance session opened");
    ok(s)
}

#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    session: Session,
    Path(classroom_id): Path<Uuid>,
) -> ApiResult<Vec<SessionSummary>> {
    authorize_record(
        &state,
        session.user_id,
        Owned::Classroom,
        classroom_id,
        Resource::Attendance,
        Action::Read,
    )
    .await?;
    ok(repo::list_sessions(&state.db, classroom_id).await?)
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionDetail> {
    authorize_record(&state, session.user_id, Owned::AttendanceSession, id, Resource::Attendance, Action::Read)
        .await?;
    let (s, records) = tokio::try_join!(repo::get_session(&state.db, id), repo::list_records(&state.db, id))?;
    let s = s.ok_or_else(|| AppError::not_found("Attendance session"))?;
    ok(SessionDetail { session: s, records })
}

#[instrument(skip(state, body))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<MarkAttendanceRequest>,
) -> ApiResult<SessionDetail> {
    authorize_record(&state, session.user_id, Owned::AttendanceSession, id, Resource::Attendance, Action::Update)
        .await?;
    let s = repo::get_session(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance session"))?;

    let ids: Vec<Uuid> = body.records.iter().map(|r| r.student_id).collect();
    let student_ids = distinct_ids(&ids);
    if student_ids.len() != ids.len() {
        return Err(AppError::validation("Each student may appear only once"));
    }

    let mut tx = state.db.begin().await?;
    let enrolled = repo::count_enrolled_tx(&mut tx, s.classroom_id, &student_ids).await?;
    if enrolled != student_ids.len() as i64 {
        warn!(session_id = %id, "attendance for students not enrolled in the classroom");
        return Err(AppError::validation("Every student must be enrolled in the classroom"));
    }
    for entry in &body.records {
        repo::upsert_record_tx(&mut tx, id, entry).await?;
    }
    tx.commit().await?;

    info!(session_id = %id, marked = body.records.len(), "attendance marked");
    let records = repo::list_records(&state.db, id).await?;
    ok(SessionDetail { session: s, records })
}

#[instrument(skip(state))]
pub async fn student_summary(
    State(state): State<AppState>,
    session: Session,
    Path(student_id): Path<Uuid>,
) -> ApiResult<AttendanceSummary> {
    authorize_record(&state, session.user_id, Owned::Student, student_id, Resource::Attendance, Action::Read)
        .await?;
    let counts = repo::student_counts(&state.db, student_id).await?;
    ok(AttendanceSummary::from_counts(student_id, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use super::super::dto::{AttendanceStatus, MarkEntry};

    fn marks(student_id: Uuid, status: AttendanceStatus) -> Json<MarkAttendanceRequest> {
        Json(MarkAttendanceRequest {
            records: vec![MarkEntry { student_id, status, notes: None }],
        })
    }

    #[tokio::test]
    async fn marking_twice_keeps_one_record_per_student() {
        let Some(state) = testing::pg_state().await else { return };
        let org = testing::organization(&state.db).await;
        let teacher = testing::admin(&state.db, org).await;
        let student = testing::student(&state.db, org).await;
        let classroom = testing::enrolled_classroom(&state.db, org, &[student]).await;
        let date = time::macros::date!(2024 - 09 - 02);
        let s = repo::get_or_create_session(&state.db, classroom, date).await.unwrap();

        mark_attendance(State(state.clone()), teacher.clone(), Path(s.id), marks(student, AttendanceStatus::Absent))
            .await
            .unwrap();
        let Json(second) =
            mark_attendance(State(state.clone()), teacher, Path(s.id), marks(student, AttendanceStatus::Late))
                .await
                .unwrap();

        let records = second.data.records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "Late");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_records WHERE session_id = $1")
            .bind(s.id)
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let again = repo::get_or_create_session(&state.db, classroom, date).await.unwrap();
        assert_eq!(again.id, s.id);
    }
}
