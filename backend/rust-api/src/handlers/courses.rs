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
    models::course::{CreateCourseRequest, GenerateCourseRequest, UpdateCourseRequest},
    models::lesson::CreateLessonRequest,
    services::{
        course_generation_service::CourseGenerationService, course_service::CourseService,
        lesson_service::LessonService, quiz_service::QuizService, AppState,
    },
};

fn generation_service(state: &AppState) -> CourseGenerationService {
    CourseGenerationService::new(
        state.repository.clone(),
        state.generator.clone(),
        state.config.generation.retry_config(),
    )
}

/// GET /api/v1/courses
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, AppError> {
    let courses = CourseService::new(state.repository.clone())
        .list(&claims.sub)
        .await?;
    Ok(Json(courses))
}

/// POST /api/v1/courses
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let course = CourseService::new(state.repository.clone())
        .create(&claims.sub, req)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /api/v1/courses/{id}
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let detail = CourseService::new(state.repository.clone())
        .detail(&course_id, &claims.sub)
        .await?;
    Ok(Json(detail))
}

/// PUT /api/v1/courses/{id}
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let course = CourseService::new(state.repository.clone())
        .update(&course_id, &claims.sub, req)
        .await?;
    Ok(Json(course))
}

/// DELETE /api/v1/courses/{id}
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    CourseService::new(state.repository.clone())
        .delete(&course_id, &claims.sub)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/courses/generate
pub async fn generate_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<GenerateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = generation_service(&state)
        .generate(&claims.sub, &req)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/courses/generate/template
pub async fn generate_template_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<GenerateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = generation_service(&state)
        .generate_from_template(&claims.sub, &req)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/courses/{id}/lessons
pub async fn list_course_lessons(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lessons = LessonService::new(state.repository.clone())
        .list(&course_id, &claims.sub)
        .await?;
    Ok(Json(lessons))
}

/// POST /api/v1/courses/{id}/lessons
pub async fn create_course_lesson(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<CreateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let lesson = LessonService::new(state.repository.clone())
        .create(&course_id, &claims.sub, req)
        .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

/// GET /api/v1/courses/{id}/quizzes
pub async fn list_course_quizzes(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = QuizService::new(state.repository.clone())
        .list_for_course(&course_id, &claims.sub)
        .await?;
    Ok(Json(quizzes))
}
