use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_dto::{
    CreateQuizRequest, QuestionResponse, SessionStatusResponse, SubmitAnswerRequest,
};
use crate::models::quiz_session::QuizSession;
use crate::utils::time::format_clock;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizRequest>,
) -> crate::error::Result<Response> {
    let config = req.into_config()?;
    let mut session = QuizSession::new(config)?;
    session.start()?;
    let status = SessionStatusResponse::from(&session);
    state.sessions.insert(session).await;
    tracing::info!(session_id = %status.session_id, questions = status.total_questions, "Quiz session created");
    Ok((StatusCode::CREATED, Json(status)).into_response())
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Json<SessionStatusResponse>> {
    let handle = state.sessions.get(id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionStatusResponse::from(&*session)))
}

#[axum::debug_handler]
pub async fn next_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Json<QuestionResponse>> {
    let handle = state.sessions.get(id).await?;
    let question = state.quiz_service.next_question(&handle).await?;
    let session = handle.lock().await;
    let time_limit_secs = session.config().time_limit_secs;
    Ok(Json(QuestionResponse {
        session_id: id,
        total_questions: session.config().question_count,
        time_limit_secs,
        time_limit_display: format_clock(time_limit_secs),
        score: session.score(),
        question,
    }))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let handle = state.sessions.get(id).await?;
    let feedback = state
        .quiz_service
        .submit_answer(&handle, req.selected_option, req.elapsed_seconds)
        .await?;
    Ok(Json(feedback).into_response())
}

#[axum::debug_handler]
pub async fn finish_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let handle = state.sessions.get(id).await?;
    let summary = handle.lock().await.finish_early()?;
    tracing::info!(session_id = %id, score = summary.score, "Quiz ended early");
    Ok(Json(summary).into_response())
}

#[axum::debug_handler]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let handle = state.sessions.get(id).await?;
    let summary = handle.lock().await.summary()?;
    Ok(Json(summary).into_response())
}

#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<StatusCode> {
    state.sessions.remove(id).await?;
    tracing::info!(session_id = %id, "Quiz session discarded");
    Ok(StatusCode::NO_CONTENT)
}
