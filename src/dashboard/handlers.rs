use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::services::{DashboardStats, Totals};
use crate::{
    access::{authorize_org, Action, Resource},
    attendance::repo as attendance_repo,
    auth::Session,
    classrooms::repo as classrooms_repo,
    error::{ok, ApiResult},
    members::repo as members_repo,
    parents::repo as parents_repo,
    quizzes::repo as quizzes_repo,
    state::AppState,
    students::repo as students_repo,
    teachers::repo as teachers_repo,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/organizations/:org_id/dashboard", get(get_dashboard))
}

#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
) -> ApiResult<DashboardStats> {
    authorize_org(&state, session.user_id, org_id, Resource::Dashboard, Action::Read).await?;

    let db = &state.db;
    let (students, teachers, parents, classrooms, quizzes, members, (responses, mean_score), attendance) = tokio::try_join!(
        students_repo::count(db, org_id),
        teachers_repo::count(db, org_id),
        parents_repo::count(db, org_id),
        classrooms_repo::count(db, org_id),
        quizzes_repo::count(db, org_id),
        members_repo::count(db, org_id),
        quizzes_repo::organization_response_stats(db, org_id),
        attendance_repo::organization_counts(db, org_id),
    )?;

    let stats = DashboardStats::from(Totals {
        students,
        teachers,
        parents,
        classrooms,
        quizzes,
        members,
        responses,
        mean_score,
        attendance,
    });
    debug!(organization_id = %org_id, ?stats, "dashboard computed");
    ok(stats)
}
