use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::utils::retry::RetryConfig;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl GenerationConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            request_timeout_secs: 120,
            max_attempts: 3,
            base_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_login: String,
    pub smtp_password: String,
    pub use_tls: bool,
    pub from_email: String,
    pub from_name: String,
    /// Log messages instead of delivering them
    pub send_disabled: bool,
    pub contact_recipient: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: "localhost".to_string(),
            smtp_port: 587,
            smtp_login: String::new(),
            smtp_password: String::new(),
            use_tls: true,
            from_email: "no-reply@skillpath.local".to_string(),
            from_name: "SkillPath".to_string(),
            send_disabled: true,
            contact_recipient: "support@skillpath.local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub storage: StorageBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub password_reset_ttl_minutes: i64,
    /// `user:password` expected on GET /metrics
    pub metrics_auth: String,
    pub generation: GenerationConfig,
    pub email: EmailConfig,
}

impl Default for Config {
    /// Local development defaults: in-memory storage, no outbound mail.
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            storage: StorageBackend::Memory,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "skillpath".to_string(),
            jwt_secret: "dev-secret-only-for-local-testing".to_string(),
            jwt_ttl_seconds: 7 * 24 * 3600,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            password_reset_ttl_minutes: 15,
            metrics_auth: "admin:changeme".to_string(),
            generation: GenerationConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then the current directory
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + APP_* overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let string_setting = |key: &str, env_key: &str, default: &str| -> String {
            settings
                .get_string(key)
                .or_else(|_| env::var(env_key))
                .unwrap_or_else(|_| default.to_string())
        };
        let int_setting = |key: &str, env_key: &str, default: i64| -> i64 {
            settings
                .get_int(key)
                .ok()
                .or_else(|| env::var(env_key).ok().and_then(|v| v.parse().ok()))
                .unwrap_or(default)
        };
        let bool_setting = |key: &str, env_key: &str, default: bool| -> bool {
            settings
                .get_bool(key)
                .ok()
                .or_else(|| {
                    env::var(env_key)
                        .ok()
                        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                })
                .unwrap_or(default)
        };

        let storage = match string_setting("database.backend", "STORAGE_BACKEND", "mongo")
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "mongo" | "mongodb" => StorageBackend::Mongo,
            other => {
                return Err(config::ConfigError::Message(format!(
                    "Unknown storage backend '{}'",
                    other
                )))
            }
        };

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .or_else(|_| {
                if env == "prod" {
                    Err(config::ConfigError::Message(
                        "JWT_SECRET must be set in production".to_string(),
                    ))
                } else {
                    eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                    Ok(defaults.jwt_secret.clone())
                }
            })?;

        let api_key = settings
            .get_string("generation.api_key")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        let generation = GenerationConfig {
            api_key,
            model: string_setting(
                "generation.model",
                "GEMINI_MODEL",
                &defaults.generation.model,
            ),
            api_base_url: string_setting(
                "generation.api_base_url",
                "GEMINI_API_BASE_URL",
                &defaults.generation.api_base_url,
            ),
            request_timeout_secs: int_setting(
                "generation.request_timeout_secs",
                "GENERATION_TIMEOUT_SECS",
                defaults.generation.request_timeout_secs as i64,
            )
            .max(1) as u64,
            max_attempts: int_setting(
                "generation.max_attempts",
                "GENERATION_MAX_ATTEMPTS",
                defaults.generation.max_attempts as i64,
            )
            .clamp(1, 10) as u32,
            base_backoff_ms: int_setting(
                "generation.base_backoff_ms",
                "GENERATION_BASE_BACKOFF_MS",
                defaults.generation.base_backoff_ms as i64,
            )
            .max(0) as u64,
        };

        let email = EmailConfig {
            smtp_server: string_setting(
                "email.smtp_server",
                "SMTP_SERVER",
                &defaults.email.smtp_server,
            ),
            smtp_port: int_setting(
                "email.smtp_port",
                "SMTP_PORT",
                defaults.email.smtp_port as i64,
            ) as u16,
            smtp_login: string_setting("email.smtp_login", "SMTP_LOGIN", ""),
            smtp_password: string_setting("email.smtp_password", "SMTP_PASSWORD", ""),
            use_tls: bool_setting("email.use_tls", "SMTP_USE_TLS", defaults.email.use_tls),
            from_email: string_setting(
                "email.from_email",
                "EMAIL_FROM",
                &defaults.email.from_email,
            ),
            from_name: string_setting(
                "email.from_name",
                "EMAIL_FROM_NAME",
                &defaults.email.from_name,
            ),
            send_disabled: bool_setting(
                "email.send_disabled",
                "EMAIL_SEND_DISABLED",
                env != "prod",
            ),
            contact_recipient: string_setting(
                "email.contact_recipient",
                "CONTACT_RECIPIENT",
                &defaults.email.contact_recipient,
            ),
        };

        Ok(Config {
            bind_addr: string_setting("server.bind_addr", "BIND_ADDR", &defaults.bind_addr),
            storage,
            mongo_uri: string_setting("database.mongo_uri", "MONGO_URI", &defaults.mongo_uri),
            mongo_database: string_setting(
                "database.mongo_database",
                "MONGO_DATABASE",
                &defaults.mongo_database,
            ),
            jwt_secret,
            jwt_ttl_seconds: int_setting(
                "auth.jwt_ttl_seconds",
                "JWT_TTL_SECONDS",
                defaults.jwt_ttl_seconds,
            ),
            bcrypt_cost: int_setting(
                "auth.bcrypt_cost",
                "BCRYPT_COST",
                defaults.bcrypt_cost as i64,
            )
            .clamp(4, 31) as u32,
            password_reset_ttl_minutes: int_setting(
                "password_reset.code_ttl_minutes",
                "PASSWORD_RESET_TTL_MINUTES",
                defaults.password_reset_ttl_minutes,
            ),
            metrics_auth: string_setting("metrics.auth", "METRICS_AUTH", &defaults.metrics_auth),
            generation,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_overrides_are_applied() {
        env::set_var("SKIP_ROOT_ENV", "1");
        env::set_var("STORAGE_BACKEND", "memory");
        env::set_var("GENERATION_MAX_ATTEMPTS", "5");
        env::set_var("GEMINI_API_KEY", "   ");

        let config = Config::load().unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.generation.max_attempts, 5);
        assert!(config.generation.api_key.is_none());

        env::remove_var("STORAGE_BACKEND");
        env::remove_var("GENERATION_MAX_ATTEMPTS");
        env::remove_var("GEMINI_API_KEY");
        env::remove_var("SKIP_ROOT_ENV");
    }

    #[test]
    #[serial]
    fn unknown_storage_backend_is_rejected() {
        env::set_var("SKIP_ROOT_ENV", "1");
        env::set_var("STORAGE_BACKEND", "postgres");

        assert!(Config::load().is_err());

        env::remove_var("STORAGE_BACKEND");
        env::remove_var("SKIP_ROOT_ENV");
    }

    #[test]
    fn retry_config_uses_configured_backoff() {
        let config = GenerationConfig::default();
        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff_for(1), Duration::from_secs(2));
    }
}
