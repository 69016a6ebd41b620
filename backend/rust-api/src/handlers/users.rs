use axum::{extract::State, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::user::UpdateSettingsRequest,
    services::{user_service::UserService, AppState},
};

/// GET /api/v1/users/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, AppError> {
    let dashboard = UserService::new(state.repository.clone())
        .dashboard(&claims.sub)
        .await?;
    Ok(Json(dashboard))
}

/// PATCH /api/v1/users/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let profile = UserService::new(state.repository.clone())
        .update_settings(&claims.sub, req)
        .await?;
    Ok(Json(profile))
}
