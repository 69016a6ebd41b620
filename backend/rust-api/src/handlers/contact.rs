use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    extractors::AppJson,
    models::contact::ContactRequest,
    services::{email_service::contact_email, AppState},
};

/// POST /api/v1/contact
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let message = contact_email(
        &state.config.email.contact_recipient,
        req.name.trim(),
        req.email.trim(),
        req.subject.trim(),
        &req.message,
    );
    state.mailer.send(message).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to deliver contact message");
        AppError::MailDelivery(e.to_string())
    })?;

    tracing::info!(from = %req.email, "Contact message delivered");
    Ok(Json(json!({ "message": "Thank you for your message, we will get back to you soon" })))
}
