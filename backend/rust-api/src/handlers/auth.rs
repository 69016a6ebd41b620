use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::user::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
        ResetPasswordRequest, UserProfile,
    },
    services::{auth_service::AuthService, AppState},
};

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.repository.clone(), state.mailer.clone(), &state.config)
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    tracing::info!("Registering new user: {}", req.email);

    let response = auth_service(&state).register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let response = auth_service(&state).login(req).await?;
    Ok(Json(response))
}

/// GET /api/v1/auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service(&state).get_user(&claims.sub).await?;
    Ok(Json(UserProfile::from(user)))
}

/// POST /api/v1/auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    auth_service(&state)
        .change_password(&claims.sub, req)
        .await?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// POST /api/v1/auth/forgot-password
///
/// Responds the same whether or not the email is registered.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    auth_service(&state).forgot_password(&req.email).await?;
    Ok(Json(json!({
        "message": "If an account exists for this email, a reset code has been sent"
    })))
}

/// POST /api/v1/auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    auth_service(&state).reset_password(req).await?;
    Ok(Json(json!({ "message": "Password has been reset" })))
}
