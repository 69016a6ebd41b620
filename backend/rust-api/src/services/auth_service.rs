use anyhow::{anyhow, Context, Result};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::user::{
    AuthResponse, ChangePasswordRequest, LoginRequest, PasswordResetCode, RegisterRequest,
    ResetPasswordRequest, Theme, User, UserProfile,
};
use crate::repositories::Repository;
use crate::services::email_service::{password_reset_email, Mailer};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_RESET_CODE: &str = "Invalid or expired reset code";
/// Wrong reset codes accepted before the pending code is discarded
pub const MAX_RESET_CODE_ATTEMPTS: u32 = 5;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService {
    repository: Arc<dyn Repository>,
    mailer: Arc<dyn Mailer>,
    jwt_service: JwtService,
    bcrypt_cost: u32,
    access_token_ttl_seconds: i64,
    reset_code_ttl_minutes: i64,
}

impl AuthService {
    pub fn new(repository: Arc<dyn Repository>, mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        Self {
            repository,
            mailer,
            jwt_service: JwtService::new(&config.jwt_secret),
            bcrypt_cost: config.bcrypt_cost,
            access_token_ttl_seconds: config.jwt_ttl_seconds,
            reset_code_ttl_minutes: config.password_reset_ttl_minutes,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.bcrypt_cost).context("Failed to hash password")
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        verify(password, hash).context("Failed to verify password")
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&req.email);

        if self.repository.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: self.hash_password(&req.password)?,
            name: req.name.trim().to_string(),
            theme: Theme::default(),
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            activity_log: Vec::new(),
            password_reset: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, email = %user.email, "User registered");
        let token = self.generate_access_token(&user)?;
        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&req.email);
        let user = self
            .repository
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !self.verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(email = %email, "Failed login attempt: invalid password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        tracing::info!(user_id = %user.id, "Successful login");
        let token = self.generate_access_token(&user)?;
        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        self.repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let mut user = self.get_user(user_id).await?;

        if !self.verify_password(&req.current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        user.password_hash = self.hash_password(&req.new_password)?;
        user.updated_at = Utc::now();
        self.repository.save_user(&user).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Emails a 6-digit reset code. Unknown addresses succeed silently.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        let Some(mut user) = self.repository.find_user_by_email(&email).await? else {
            tracing::info!(email = %email, "Password reset requested for unknown email");
            return Ok(());
        };

        let code = generate_reset_code();
        user.password_reset = Some(PasswordResetCode {
            code_hash: hash_code(&code),
            expires_at: Utc::now() + Duration::minutes(self.reset_code_ttl_minutes),
            failed_attempts: 0,
        });
        user.updated_at = Utc::now();
        self.repository.save_user(&user).await?;

        let message = password_reset_email(&user.email, &user.name, &code, self.reset_code_ttl_minutes);
        self.mailer.send(message).await.map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
            AppError::MailDelivery(e.to_string())
        })?;

        tracing::info!(user_id = %user.id, "Password reset code sent");
        Ok(())
    }

    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AppError> {
        let email = normalize_email(&req.email);
        let invalid = || AppError::InvalidInput(INVALID_RESET_CODE.to_string());

        let mut user = self
            .repository
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid)?;
        let reset = user.password_reset.as_mut().ok_or_else(invalid)?;

        if reset.expires_at < Utc::now() {
            tracing::warn!(user_id = %user.id, "Rejected expired password reset code");
            return Err(invalid());
        }

        if reset.code_hash != hash_code(req.code.trim()) {
            reset.failed_attempts += 1;
            let failed_attempts = reset.failed_attempts;
            if failed_attempts >= MAX_RESET_CODE_ATTEMPTS {
                user.password_reset = None;
            }
            user.updated_at = Utc::now();
            self.repository.save_user(&user).await?;

            tracing::warn!(
                user_id = %user.id,
                failed_attempts,
                discarded = failed_attempts >= MAX_RESET_CODE_ATTEMPTS,
                "Rejected password reset code"
            );
            return Err(invalid());
        }

        user.password_hash = self.hash_password(&req.new_password)?;
        user.password_reset = None;
        user.updated_at = Utc::now();
        self.repository.save_user(&user).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    fn generate_access_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_ttl_seconds);

        let claims = JwtClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        self.jwt_service
            .generate_token(claims)
            .map_err(|e| anyhow!("Failed to generate token: {}", e))
    }
}

fn generate_reset_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

/// SHA-256 hex digest; only this is stored
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn code_digest_is_stable_hex() {
        let digest = hash_code("123456");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_code("123456"));
        assert_ne!(digest, hash_code("654321"));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ann@Example.COM "), "ann@example.com");
    }
}
