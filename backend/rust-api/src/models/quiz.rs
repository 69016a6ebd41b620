use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Quiz document stored in the "quizzes" collection.
/// Attempts are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Maximum score of the quiz
    #[serde(rename = "score", default)]
    pub max_score: u32,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn has_attempt_by(&self, user_id: &str) -> bool {
        self.attempts.iter().any(|attempt| attempt.user_id == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub user_id: String,
    /// Percentage, integer-rounded
    pub score: u32,
    pub total_questions: u32,
    pub answers: Vec<AnswerDetail>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question_index: u32,
    pub selected_answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub course_id: String,
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "A quiz needs at least one question"))]
    pub questions: Vec<Question>,
    pub score: Option<u32>,
}

/// POST /api/v1/quizzes/{id}/submit
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmissionResult {
    pub percentage: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub points_awarded: u32,
    pub already_completed: bool,
    pub results: Vec<AnswerDetail>,
}
