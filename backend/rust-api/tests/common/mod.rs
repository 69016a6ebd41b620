#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use skillpath_api::{
    config::Config,
    create_router,
    generation::{GenerationError, TextGenerator},
    repositories::InMemoryRepository,
    services::{
        email_service::{Mailer, OutgoingEmail},
        AppState,
    },
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Replays queued responses; an empty queue fails permanently.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: AtomicU32,
}

impl ScriptedGenerator {
    pub fn push_ok(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(GenerationError::new(message)));
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::new("no scripted response left")))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("SMTP server unreachable");
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub generator: Arc<ScriptedGenerator>,
    pub mailer: Arc<RecordingMailer>,
    pub repository: Arc<InMemoryRepository>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.bcrypt_cost = 4;
    config.generation.base_backoff_ms = 1;
    config.metrics_auth = "metrics:secret".to_string();
    config
}

pub fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let generator = Arc::new(ScriptedGenerator::default());
    let mailer = Arc::new(RecordingMailer::default());
    let repository = Arc::new(InMemoryRepository::new());

    let state = AppState::from_parts(
        test_config(),
        repository.clone(),
        generator.clone(),
        mailer.clone(),
    );

    TestApp {
        router: create_router(Arc::new(state)),
        generator,
        mailer,
        repository,
    }
}

impl TestApp {
    /// Sends a request and returns the status with the JSON body (Null if empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// Registers a user and returns the bearer token.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({ "email": email, "password": password, "name": "Test User" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a template course with `lessons` lessons and returns the response body.
    pub async fn template_course(&self, token: &str, topic: &str, lessons: u32) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/courses/generate/template",
                Some(token),
                Some(json!({ "topic": topic, "difficulty": "beginner", "numberOfLessons": lessons })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "template generation failed: {}", body);
        body
    }
}

pub const TEMPLATE_ANSWERS: [&str; 5] = [
    "Understanding fundamentals",
    "Practice consistently",
    "Hands-on practice",
    "They ensure quality and maintainability",
    "Stay curious and persistent",
];
