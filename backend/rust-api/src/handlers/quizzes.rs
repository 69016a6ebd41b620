use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::quiz::{CreateQuizRequest, SubmitQuizRequest},
    services::{quiz_service::QuizService, AppState},
};

/// POST /api/v1/quizzes
pub async fn create_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let quiz = QuizService::new(state.repository.clone())
        .create(&claims.sub, req)
        .await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// GET /api/v1/quizzes/{id}
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = QuizService::new(state.repository.clone())
        .get(&quiz_id, &claims.sub)
        .await?;
    Ok(Json(quiz))
}

/// POST /api/v1/quizzes/{id}/submit
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
    AppJson(req): AppJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = QuizService::new(state.repository.clone())
        .submit(&quiz_id, &claims.sub, req.answers)
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/quizzes/{id}/attempts
pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = QuizService::new(state.repository.clone())
        .list_attempts(&quiz_id, &claims.sub)
        .await?;
    Ok(Json(attempts))
}
