use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    CreateQuizRequest, QuestionView, QuizDetail, ResponseReview, ResponseView, SubmitResponseRequest,
    UpdateQuizRequest,
};
use super::repo_types::Quiz;
use super::{repo, services};
use crate::{
    access::{authorize_org, authorize_record, with_scoped_permission, Action, Owned, Resource},
    auth::Session,
    error::{ok, ApiResult, AppError, AppResult},
    query::{ListParams, Page},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations/:org_id/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizzes/:id", get(get_quiz).patch(update_quiz).delete(delete_quiz))
        .route("/quizzes/:id/responses", get(list_responses).post(submit_response))
        .route("/quizzes/:id/responses/export", get(export_responses))
        .route("/responses/:id", get(review_response))
}

async fn detail(state: &AppState, id: Uuid, reveal: bool) -> AppResult<QuizDetail> {
    let (quiz, questions) = tokio::try_join!(repo::get(&state.db, id), repo::questions(&state.db, id))?;
    let quiz = quiz.ok_or_else(|| AppError::not_found("Quiz"))?;
    Ok(QuizDetail {
        quiz,
        questions: questions.into_iter().map(|q| QuestionView::new(q, reveal)).collect(),
    })
}

#[instrument(skip(state))]
pub async fn list_quizzes(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Quiz>> {
    let params = params.clamped(state.config.max_items_per_page);
    let page = with_scoped_permission(
        state.access.as_ref(),
        session.user_id,
        org_id,
        Resource::Quiz,
        Action::Read,
        |_| repo::list(&state.db, org_id, &params),
    )
    .await?;
    ok(page)
}

#[instrument(skip(state, body))]
pub async fn create_quiz(
    State(state): State<AppState>,
    session: Session,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateQuizRequest>,
) -> ApiResult<QuizDetail> {
    authorize_org(&state, session.user_id, org_id, Resource::Quiz, Action::Create).await?;

    let title = services::validate_title(&body.title)?;
    let questions = services::validate_questions(body.questions)?;

    let mut tx = state.db.begin().await?;
    let id = repo::insert_tx(&mut tx, org_id, &title, body.description.trim(), session.user_id).await?;
    repo::replace_questions_tx(&mut tx, id, &questions).await?;
    tx.commit().await?;

    info!(quiz_id = %id, organization_id = %org_id, questions = questions.len(), "quiz created");
    ok(detail(&state, id, true).await?)
}

#[instrument(skip(state))]
pub async fn get_quiz(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<QuizDetail> {
    let (_, grant) = authorize_record(&state, session.user_id, Owned::Quiz, id, Resource::Quiz, Action::Read).await?;
    ok(detail(&state, id, grant.is_manager()).await?)
}

#[instrument(skip(state, body))]
pub async fn update_quiz(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateQuizRequest>,
) -> ApiResult<QuizDetail> {
    authorize_record(&state, session.user_id, Owned::Quiz, id, Resource::Quiz, Action::Update).await?;

    let title = body.title.as_deref().map(services::validate_title).transpose()?;
    let questions = body.questions.map(services::validate_questions).transpose()?;

    let mut tx = state.db.begin().await?;
    if !repo::lock_tx(&mut tx, id, true).await? {
        return Err(AppError::not_found("Quiz"));
    }
    if questions.is_some() && repo::response_count_tx(&mut tx, id).await? > 0 {
        return Err(AppError::conflict("Questions cannot change once responses exist"));
    }
    repo::update_tx(&mut tx, id, title.as_deref(), body.description.as_deref().map(str::trim)).await?;
    if let Some(questions) = &questions {
        repo::replace_questions_tx(&mut tx, id, questions).await?;
    }
    tx.commit().await?;

    info!(quiz_id = %id, replaced_questions = questions.is_some(), "quiz updated");
    ok(detail(&state, id, true).await?)
}

#[instrument(skip(state))]
pub async fn delete_quiz(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    authorize_record(&state, session.user_id, Owned::Quiz, id, Resource::Quiz, Action::Delete).await?;

    let mut tx = state.db.begin().await?;
    if !repo::delete_tx(&mut tx, id).await? {
        return Err(AppError::not_found("Quiz"));
    }
    tx.commit().await?;

    info!(quiz_id = %id, "quiz deleted");
    ok(id)
}

#[instrument(skip(state, body))]
pub async fn submit_response(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitResponseRequest>,
) -> ApiResult<ResponseReview> {
    authorize_record(&state, session.user_id, Owned::Quiz, id, Resource::QuizResponse, Action::Create).await?;

    let mut tx = state.db.begin().await?;
    if !repo::lock_tx(&mut tx, id, false).await? {
        return Err(AppError::not_found("Quiz"));
    }
    let questions = repo::questions(&mut *tx, id).await?;
    services::check_answer_keys(&questions, &body.answers)?;
    let scored = services::score_response(&questions, &body.answers);

    let response_id = repo::insert_response_tx(&mut tx, id, session.user_id, &body.answers, scored.score)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                warn!(quiz_id = %id, user_id = %session.user_id, "duplicate quiz submission");
                AppError::conflict("Quiz already submitted")
            }
            other => other,
        })?;
    tx.commit().await?;

    info!(
        quiz_id = %id,
        %response_id,
        correct = scored.correct_count(),
        total = questions.len(),
        "quiz response recorded"
    );

    let row = repo::get_response(&state.db, response_id)
        .await?
        .ok_or_else(|| AppError::not_found("Response"))?;
    let question_count = questions.len();
    ok(ResponseReview {
        correct_count: scored.correct_count(),
        question_count,
        items: services::review(questions, &body.answers),
        response: row.into(),
    })
}

/// Managers see every response; other members only their own.
#[instrument(skip(state))]
pub async fn list_responses(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<ResponseView>> {
    let (_, grant) =
        authorize_record(&state, session.user_id, Owned::Quiz, id, Resource::QuizResponse, Action::Read).await?;
    let params = params.clamped(state.config.max_items_per_page);
    let only_user = (!grant.is_manager()).then_some(session.user_id);
    let page = repo::list_responses(&state.db, id, only_user, &params).await?;
    ok(page.map(ResponseView::from))
}

#[instrument(skip(state))]
pub async fn export_responses(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let (_, grant) =
        authorize_record(&state, session.user_id, Owned::Quiz, id, Resource::QuizResponse, Action::Read).await?;
    if !grant.is_manager() {
        return Err(AppError::access_denied());
    }

    let max = state.config.max_items_per_page;
    let params = ListParams {
        page: 0,
        items_per_page: max,
        ..params
    }
    .clamped(max);
    let page = repo::list_responses(&state.db, id, None, &params).await?;
    if page.total_count > page.items.len() as i64 {
        warn!(quiz_id = %id, total = page.total_count, exported = page.items.len(), "export truncated");
    }
    let csv = services::responses_csv(&page.items)?;

    info!(quiz_id = %id, rows = page.items.len(), "responses exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"quiz-{}-responses.csv\"", id),
            ),
        ],
        csv,
    ))
}

#[instrument(skip(state))]
pub async fn review_response(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<ResponseReview> {
    let (_, grant) =
        authorize_record(&state, session.user_id, Owned::QuizResponse, id, Resource::QuizResponse, Action::Read)
            .await?;
    let row = repo::get_response(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Response"))?;
    if row.user_id != session.user_id && !grant.is_manager() {
        return Err(AppError::access_denied());
    }

    let questions = repo::questions(&state.db, row.quiz_id).await?;
    let scored = services::score_response(&questions, &row.answers.0);
    let question_count = questions.len();
    let items = services::review(questions, &row.answers.0);
    ok(ResponseReview {
        correct_count: scored.correct_count(),
        question_count,
        items,
        response: row.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MemberRole;
    use crate::testing;
    use serde_json::json;

    fn body<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Json<T> {
        Json(serde_json::from_value(value).unwrap())
    }

    #[tokio::test]
    async fn questions_are_frozen_once_a_response_exists() {
        let Some(state) = testing::pg_state().await else { return };
        let org = testing::organization(&state.db).await;
        let admin = testing::admin(&state.db, org).await;
        let pupil = testing::user(&state.db, "Pupil").await;
        testing::member(&state.db, org, pupil.user_id, MemberRole::Member).await;

        let Json(created) = create_quiz(
            State(state.clone()),
            admin.clone(),
            Path(org),
            body(json!({
                "title": "Capitals",
                "questions": [{ "prompt": "France?", "options": ["Paris", "Lyon"], "correctAnswer": "Paris" }]
            })),
        )
        .await
        .unwrap();
        let quiz = created.data;
        let question = quiz.questions[0].id;

        submit_response(
            State(state.clone()),
            pupil,
            Path(quiz.quiz.id),
            body(json!({ "answers": { question.to_string(): "Paris" } })),
        )
        .await
        .unwrap();

        let replace = update_quiz(
            State(state.clone()),
            admin.clone(),
            Path(quiz.quiz.id),
            body(json!({ "questions": [{ "prompt": "Spain?", "options": ["Madrid", "Seville"], "correctAnswer": "Madrid" }] })),
        )
        .await;
        assert!(matches!(replace, Err(AppError::Conflict(_))));

        let Json(renamed) =
            update_quiz(State(state.clone()), admin, Path(quiz.quiz.id), body(json!({ "title": "Europe" })))
                .await
                .unwrap();
        assert_eq!(renamed.data.quiz.title, "Europe");
        assert_eq!(renamed.data.questions[0].id, question);
    }
}
