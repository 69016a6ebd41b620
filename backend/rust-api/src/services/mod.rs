use anyhow::Context;
use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::generation::{GeminiClient, TextGenerator, UnconfiguredGenerator};
use crate::repositories::{InMemoryRepository, MongoRepository, Repository};
use crate::services::email_service::{LogMailer, Mailer, SmtpMailer};

pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn Repository>,
    pub generator: Arc<dyn TextGenerator>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let repository: Arc<dyn Repository> = match config.storage {
            StorageBackend::Mongo => {
                let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
                    .await
                    .context("Failed to connect to MongoDB")?;
                let repository = MongoRepository::new(mongo_client.database(&config.mongo_database));

                tokio::time::timeout(std::time::Duration::from_secs(5), repository.ping())
                    .await
                    .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 5s"))??;
                tracing::info!("MongoDB connected");

                repository.ensure_indexes().await?;
                Arc::new(repository)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, data is lost on restart");
                Arc::new(InMemoryRepository::new())
            }
        };

        let generator: Arc<dyn TextGenerator> = match &config.generation.api_key {
            Some(api_key) => Arc::new(GeminiClient::new(&config.generation, api_key.clone())?),
            None => {
                tracing::warn!("GEMINI_API_KEY is not set, AI course generation is disabled");
                Arc::new(UnconfiguredGenerator)
            }
        };

        let mailer: Arc<dyn Mailer> = if config.email.send_disabled {
            tracing::warn!("Email sending is disabled, messages will only be logged");
            Arc::new(LogMailer)
        } else {
            Arc::new(SmtpMailer::new(&config.email)?)
        };

        Ok(Self::from_parts(config, repository, generator, mailer))
    }

    pub fn from_parts(
        config: Config,
        repository: Arc<dyn Repository>,
        generator: Arc<dyn TextGenerator>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            repository,
            generator,
            mailer,
        }
    }
}

pub mod auth_service;
pub mod course_generation_service;
pub mod course_service;
pub mod course_templates;
pub mod email_service;
pub mod lesson_service;
pub mod progress_service;
pub mod quiz_service;
pub mod user_service;
