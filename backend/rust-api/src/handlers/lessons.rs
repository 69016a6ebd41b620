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
    models::lesson::{ToggleCompletionRequest, UpdateLessonRequest},
    services::{lesson_service::LessonService, progress_service::ProgressService, AppState},
};

/// GET /api/v1/lessons/{id}
pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = LessonService::new(state.repository.clone())
        .get(&lesson_id, &claims.sub)
        .await?;
    Ok(Json(lesson))
}

/// PUT /api/v1/lessons/{id}
pub async fn update_lesson(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(lesson_id): Path<String>,
    AppJson(req): AppJson<UpdateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let lesson = LessonService::new(state.repository.clone())
        .update(&lesson_id, &claims.sub, req)
        .await?;
    Ok(Json(lesson))
}

/// DELETE /api/v1/lessons/{id}
pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    LessonService::new(state.repository.clone())
        .delete(&lesson_id, &claims.sub)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/lessons/{id}/complete
pub async fn toggle_completion(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(lesson_id): Path<String>,
    AppJson(req): AppJson<ToggleCompletionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = ProgressService::new(state.repository.clone())
        .toggle_lesson_completion(&lesson_id, &claims.sub, req.is_completing)
        .await?;
    Ok(Json(response))
}
