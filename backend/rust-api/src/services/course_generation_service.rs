use chrono::Utc;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::generation::{build_course_prompt, classify, extract_json, ExtractError, TextGenerator};
use crate::metrics::{self, COURSES_GENERATED_TOTAL, JSON_REPAIR_PASSES_TOTAL};
use crate::models::course::{CourseSummary, GenerateCourseRequest, GeneratedCourseResponse};
use crate::models::generation::GeneratedPayload;
use crate::models::quiz::Question;
use crate::models::{Course, Difficulty, Lesson, Quiz};
use crate::repositories::Repository;
use crate::services::course_templates::template_course;
use crate::utils::retry::{retry_classified, RetryConfig};

pub const MIN_LESSONS: i64 = 3;
pub const MAX_LESSONS: i64 = 10;

pub const GENERATED_LESSON_POINTS: u32 = 20;
pub const TEMPLATE_LESSON_POINTS: u32 = 10;

const REQUIRED_KEYS: [&str; 3] = ["course", "lessons", "quiz"];

/// Validated generation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationParams {
    pub topic: String,
    pub difficulty: Difficulty,
    pub lesson_count: u8,
}

impl GenerationParams {
    pub fn from_request(req: &GenerateCourseRequest) -> Result<Self, AppError> {
        let topic = req.topic.trim();
        if topic.is_empty() {
            return Err(AppError::InvalidInput("Topic is required".to_string()));
        }

        if !(MIN_LESSONS..=MAX_LESSONS).contains(&req.number_of_lessons) {
            return Err(AppError::InvalidInput(format!(
                "Number of lessons must be between {} and {}",
                MIN_LESSONS, MAX_LESSONS
            )));
        }

        let difficulty = req
            .difficulty
            .parse::<Difficulty>()
            .map_err(AppError::InvalidInput)?;

        Ok(Self {
            topic: topic.to_string(),
            difficulty,
            lesson_count: req.number_of_lessons as u8,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Ai,
    Template,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Ai => "ai",
            GenerationMode::Template => "template",
        }
    }

    fn default_lesson_points(&self) -> u32 {
        match self {
            GenerationMode::Ai => GENERATED_LESSON_POINTS,
            GenerationMode::Template => TEMPLATE_LESSON_POINTS,
        }
    }
}

/// Lists top-level keys that are absent or have the wrong JSON type.
pub fn missing_keys(value: &Value) -> Vec<String> {
    REQUIRED_KEYS
        .into_iter()
        .filter(|&key| match value.get(key) {
            Some(Value::Array(_)) => key != "lessons",
            Some(Value::Object(_)) => key == "lessons",
            _ => true,
        })
        .map(str::to_string)
        .collect()
}

pub struct CourseGenerationService {
    repository: Arc<dyn Repository>,
    generator: Arc<dyn TextGenerator>,
    retry_config: RetryConfig,
}

impl CourseGenerationService {
    pub fn new(
        repository: Arc<dyn Repository>,
        generator: Arc<dyn TextGenerator>,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            repository,
            generator,
            retry_config,
        }
    }

    /// Generates a course with the text generation API and persists it.
    pub async fn generate(
        &self,
        user_id: &str,
        req: &GenerateCourseRequest,
    ) -> Result<GeneratedCourseResponse, AppError> {
        let params = GenerationParams::from_request(req)?;
        tracing::info!(
            user_id = %user_id,
            topic = %params.topic,
            difficulty = %params.difficulty,
            lessons = params.lesson_count,
            "Generating course"
        );

        let prompt = build_course_prompt(&params.topic, params.difficulty, params.lesson_count);
        let generator = &self.generator;
        let prompt = prompt.as_str();

        let raw = retry_classified(&self.retry_config, classify, |attempt| async move {
            tracing::debug!(attempt, "Calling text generation API");
            let result = generator.generate(prompt).await;
            metrics::record_generation_attempt(result.is_ok());
            result
        })
        .await?;

        let payload = parse_payload(&raw)?;
        self.persist(user_id, &params, payload, GenerationMode::Ai)
            .await
    }

    /// Template fast path: no upstream call, fails only on persistence.
    pub async fn generate_from_template(
        &self,
        user_id: &str,
        req: &GenerateCourseRequest,
    ) -> Result<GeneratedCourseResponse, AppError> {
        let params = GenerationParams::from_request(req)?;
        tracing::info!(
            user_id = %user_id,
            topic = %params.topic,
            lessons = params.lesson_count,
            "Generating course from template"
        );

        let payload = template_course(&params.topic, params.difficulty, params.lesson_count);
        self.persist(user_id, &params, payload, GenerationMode::Template)
            .await
    }

    /// Writes the course, then all lessons concurrently, then the quiz.
    /// Nothing is rolled back: a failure after the course write leaves it in
    /// place with whatever lessons made it.
    async fn persist(
        &self,
        user_id: &str,
        params: &GenerationParams,
        payload: GeneratedPayload,
        mode: GenerationMode,
    ) -> Result<GeneratedCourseResponse, AppError> {
        let now = Utc::now();
        let GeneratedPayload {
            course: generated_course,
            lessons: generated_lessons,
            quiz: generated_quiz,
        } = payload;

        let course = Course {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: non_blank(generated_course.title)
                .unwrap_or_else(|| format!("{} Course", params.topic)),
            topic: params.topic.clone(),
            description: generated_course.description.unwrap_or_default(),
            difficulty: params.difficulty,
            estimated_duration: generated_course.estimated_duration.unwrap_or_default(),
            learning_objectives: generated_course.learning_objectives,
            total_lessons: generated_lessons.len() as u32,
            completed_lessons: 0,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_course(&course).await?;
        tracing::debug!(course_id = %course.id, "Course persisted");

        let lessons: Vec<Lesson> = generated_lessons
            .into_iter()
            .enumerate()
            .map(|(index, generated)| Lesson {
                id: Uuid::new_v4().to_string(),
                course_id: course.id.clone(),
                user_id: user_id.to_string(),
                title: non_blank(generated.title)
                    .unwrap_or_else(|| format!("Lesson {}", index + 1)),
                content: generated.content.unwrap_or_default(),
                order: generated.order.unwrap_or(index as u32 + 1),
                points: generated.points.unwrap_or(mode.default_lesson_points()),
                duration: generated.duration,
                video_search_term: generated.video_search_term,
                completed: false,
                completed_by: Vec::new(),
                created_at: now,
                updated_at: now,
            })
            .collect();

        let questions: Vec<Question> = generated_quiz
            .questions
            .into_iter()
            .map(|generated| Question {
                correct_answer: generated.resolved_answer(),
                question: generated.question,
                options: generated.options,
                explanation: generated.explanation,
            })
            .collect();
        let quiz = Quiz {
            id: Uuid::new_v4().to_string(),
            course_id: course.id.clone(),
            user_id: user_id.to_string(),
            title: non_blank(generated_quiz.title)
                .unwrap_or_else(|| format!("{} Quiz", params.topic)),
            description: generated_quiz.description.unwrap_or_default(),
            max_score: generated_quiz
                .score
                .unwrap_or(questions.len() as u32 * 10),
            questions,
            attempts: Vec::new(),
            created_at: now,
        };

        if let Err(err) = self.persist_children(&lessons, &quiz).await {
            tracing::warn!(
                course_id = %course.id,
                error = %err,
                "Course left without complete lessons/quiz after a failed write"
            );
            return Err(err.into());
        }

        COURSES_GENERATED_TOTAL
            .with_label_values(&[mode.as_str()])
            .inc();
        tracing::info!(
            course_id = %course.id,
            lessons = lessons.len(),
            quiz_id = %quiz.id,
            mode = mode.as_str(),
            "Course generated"
        );

        Ok(GeneratedCourseResponse {
            course: CourseSummary {
                course,
                lessons_count: lessons.len(),
                quiz_id: Some(quiz.id.clone()),
            },
            lessons,
            quiz,
        })
    }

    async fn persist_children(&self, lessons: &[Lesson], quiz: &Quiz) -> anyhow::Result<()> {
        try_join_all(
            lessons
                .iter()
                .map(|lesson| self.repository.insert_lesson(lesson)),
        )
        .await?;
        self.repository.insert_quiz(quiz).await
    }
}

/// Extracts, repairs and shape-checks raw model output.
pub fn parse_payload(raw: &str) -> Result<GeneratedPayload, AppError> {
    let (value, pass) = extract_json(raw)?;
    JSON_REPAIR_PASSES_TOTAL
        .with_label_values(&[pass.as_str()])
        .inc();
    tracing::debug!(pass = pass.as_str(), "Generated JSON parsed");

    let missing = missing_keys(&value);
    if !missing.is_empty() {
        let present: Vec<&str> = value
            .as_object()
            .map(|object| object.keys().map(String::as_str).collect())
            .unwrap_or_default();
        return Err(AppError::InvalidGeneratedStructure {
            details: format!("Top-level keys present: [{}]", present.join(", ")),
            missing,
        });
    }

    let payload: GeneratedPayload = serde_json::from_value(value.clone()).map_err(|err| {
        AppError::GeneratedContent(ExtractError::MalformedGeneratedJson {
            message: err.to_string(),
            preview: value.to_string().chars().take(200).collect(),
        })
    })?;

    // Grading needs at least one question
    if payload.quiz.questions.is_empty() {
        return Err(AppError::InvalidGeneratedStructure {
            missing: vec!["quiz.questions".to_string()],
            details: "Generated quiz has no questions".to_string(),
        });
    }

    Ok(payload)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::UnconfiguredGenerator;
    use crate::models::{Attempt, User};
    use crate::repositories::InMemoryRepository;
    use async_trait::async_trait;
    use serde_json::json;

    fn request(topic: &str, difficulty: &str, lessons: i64) -> GenerateCourseRequest {
        GenerateCourseRequest {
            topic: topic.to_string(),
            difficulty: difficulty.to_string(),
            number_of_lessons: lessons,
        }
    }

    #[test]
    fn accepts_every_valid_combination() {
        for difficulty in ["beginner", "intermediate", "advanced"] {
            for lessons in MIN_LESSONS..=MAX_LESSONS {
                let params = GenerationParams::from_request(&request(" Rust ", difficulty, lessons))
                    .unwrap();
                assert_eq!(params.topic, "Rust");
                assert_eq!(params.lesson_count as i64, lessons);
            }
        }
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        for (topic, difficulty, lessons) in [
            ("   ", "beginner", 5),
            ("Rust", "beginner", 2),
            ("Rust", "beginner", 11),
            ("Rust", "beginner", -1),
            ("Rust", "expert", 5),
        ] {
            let err = GenerationParams::from_request(&request(topic, difficulty, lessons)).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{:?}", err);
        }
    }

    #[test]
    fn reports_each_missing_key() {
        assert_eq!(
            missing_keys(&json!({ "course": {} })),
            vec!["lessons".to_string(), "quiz".to_string()]
        );
        assert_eq!(
            missing_keys(&json!({ "course": {}, "lessons": {}, "quiz": {} })),
            vec!["lessons".to_string()]
        );
        assert!(missing_keys(&json!({ "course": {}, "lessons": [], "quiz": {} })).is_empty());
    }

    #[test]
    fn parse_payload_handles_fenced_output() {
        let raw = "Sure!\n```json\n{\"course\": {\"title\": \"Rust\"}, \"lessons\": [{\"title\": \"One\",}], \"quiz\": {\"questions\": [{\"question\": \"Q\", \"answer\": \"A\"}]}}\n```";
        let payload = parse_payload(raw).unwrap();
        assert_eq!(payload.course.title.as_deref(), Some("Rust"));
        assert_eq!(payload.lessons.len(), 1);
    }

    #[test]
    fn parse_payload_rejects_quiz_without_questions() {
        let err = parse_payload(r#"{"course": {}, "lessons": [], "quiz": {"questions": []}}"#)
            .unwrap_err();
        match err {
            AppError::InvalidGeneratedStructure { missing, .. } => {
                assert_eq!(missing, vec!["quiz.questions"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parse_payload_rejects_incomplete_structure() {
        let err = parse_payload(r#"{"course": {"title": "Rust"}}"#).unwrap_err();
        match err {
            AppError::InvalidGeneratedStructure { missing, .. } => {
                assert_eq!(missing, vec!["lessons", "quiz"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Delegates to the in-memory store but refuses every quiz insert.
    struct QuizWriteFails(InMemoryRepository);

    #[async_trait]
    impl Repository for QuizWriteFails {
        async fn ping(&self) -> anyhow::Result<()> {
            self.0.ping().await
        }
        async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
            self.0.insert_user(user).await
        }
        async fn find_user(&self, id: &str) -> anyhow::Result<Option<User>> {
            self.0.find_user(id).await
        }
        async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            self.0.find_user_by_email(email).await
        }
        async fn save_user(&self, user: &User) -> anyhow::Result<()> {
            self.0.save_user(user).await
        }
        async fn insert_course(&self, course: &Course) -> anyhow::Result<()> {
            self.0.insert_course(course).await
        }
        async fn find_course(&self, id: &str) -> anyhow::Result<Option<Course>> {
            self.0.find_course(id).await
        }
        async fn list_courses(&self, user_id: &str) -> anyhow::Result<Vec<Course>> {
            self.0.list_courses(user_id).await
        }
        async fn save_course(&self, course: &Course) -> anyhow::Result<()> {
            self.0.save_course(course).await
        }
        async fn delete_course(&self, id: &str) -> anyhow::Result<()> {
            self.0.delete_course(id).await
        }
        async fn insert_lesson(&self, lesson: &Lesson) -> anyhow::Result<()> {
            self.0.insert_lesson(lesson).await
        }
        async fn find_lesson(&self, id: &str) -> anyhow::Result<Option<Lesson>> {
            self.0.find_lesson(id).await
        }
        async fn list_lessons(&self, course_id: &str) -> anyhow::Result<Vec<Lesson>> {
            self.0.list_lessons(course_id).await
        }
        async fn save_lesson(&self, lesson: &Lesson) -> anyhow::Result<()> {
            self.0.save_lesson(lesson).await
        }
        async fn delete_lesson(&self, id: &str) -> anyhow::Result<()> {
            self.0.delete_lesson(id).await
        }
        async fn delete_lessons_for_course(&self, course_id: &str) -> anyhow::Result<u64> {
            self.0.delete_lessons_for_course(course_id).await
        }
        async fn insert_quiz(&self, _quiz: &Quiz) -> anyhow::Result<()> {
            anyhow::bail!("quiz collection unavailable")
        }
        async fn find_quiz(&self, id: &str) -> anyhow::Result<Option<Quiz>> {
            self.0.find_quiz(id).await
        }
        async fn list_quizzes(&self, course_id: &str) -> anyhow::Result<Vec<Quiz>> {
            self.0.list_quizzes(course_id).await
        }
        async fn append_attempt(&self, quiz_id: &str, attempt: &Attempt) -> anyhow::Result<()> {
            self.0.append_attempt(quiz_id, attempt).await
        }
        async fn delete_quizzes_for_course(&self, course_id: &str) -> anyhow::Result<u64> {
            self.0.delete_quizzes_for_course(course_id).await
        }
    }

    #[tokio::test]
    async fn failed_quiz_write_leaves_orphaned_course() {
        let repository = Arc::new(QuizWriteFails(InMemoryRepository::new()));
        let service = CourseGenerationService::new(
            repository.clone(),
            Arc::new(UnconfiguredGenerator),
            RetryConfig::default(),
        );

        let err = service
            .generate_from_template("u1", &request("Rust", "beginner", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)), "{:?}", err);
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let courses = repository.list_courses("u1").await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].total_lessons, 4);
        assert_eq!(repository.list_lessons(&courses[0].id).await.unwrap().len(), 4);
        assert!(repository.list_quizzes(&courses[0].id).await.unwrap().is_empty());
    }
}
