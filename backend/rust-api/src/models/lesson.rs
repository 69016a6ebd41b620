use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_LESSON_POINTS: u32 = 10;

/// Lesson document stored in the "lessons" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(rename = "_id")]
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub order: u32,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_search_term: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_by: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_points() -> u32 {
    DEFAULT_LESSON_POINTS
}

impl Lesson {
    pub fn is_completed_by(&self, user_id: &str) -> bool {
        self.completed_by.iter().any(|id| id == user_id)
    }

    /// Adds the user to the completer set. Returns false if already present.
    pub fn mark_completed_by(&mut self, user_id: &str) -> bool {
        if self.is_completed_by(user_id) {
            return false;
        }
        self.completed_by.push(user_id.to_string());
        self.completed = true;
        self.updated_at = Utc::now();
        true
    }

    /// Removes the user from the completer set. Returns false if absent.
    pub fn unmark_completed_by(&mut self, user_id: &str) -> bool {
        let before = self.completed_by.len();
        self.completed_by.retain(|id| id != user_id);
        if self.completed_by.len() == before {
            return false;
        }
        self.completed = !self.completed_by.is_empty();
        self.updated_at = Utc::now();
        true
    }
}

/// Lesson as seen by a specific user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub is_completed: bool,
}

impl LessonView {
    pub fn for_user(lesson: Lesson, user_id: &str) -> Self {
        let is_completed = lesson.is_completed_by(user_id);
        Self {
            lesson,
            is_completed,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub order: Option<u32>,
    pub points: Option<u32>,
    pub duration: Option<String>,
    pub video_search_term: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLessonRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<u32>,
    pub points: Option<u32>,
    pub duration: Option<String>,
    pub video_search_term: Option<String>,
}

/// PATCH /api/v1/lessons/{id}/complete
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleCompletionRequest {
    pub is_completing: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionAction {
    Completed,
    Unmarked,
    NoChange,
}

impl CompletionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionAction::Completed => "completed",
            CompletionAction::Unmarked => "unmarked",
            CompletionAction::NoChange => "no_change",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleCompletionResponse {
    pub lesson: Lesson,
    pub is_completed: bool,
    pub points_change: i32,
    pub total_points: u32,
    pub action: CompletionAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson() -> Lesson {
        Lesson {
            id: "l1".to_string(),
            course_id: "c1".to_string(),
            user_id: "u1".to_string(),
            title: "Intro".to_string(),
            content: String::new(),
            order: 1,
            points: DEFAULT_LESSON_POINTS,
            duration: None,
            video_search_term: None,
            completed: false,
            completed_by: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completed_flag_follows_completer_set() {
        let mut l = lesson();
        assert!(l.mark_completed_by("a"));
        assert!(!l.mark_completed_by("a"));
        assert!(l.mark_completed_by("b"));
        assert_eq!(l.completed_by.len(), 2);

        assert!(l.unmark_completed_by("a"));
        assert!(l.completed);
        assert!(l.unmark_completed_by("b"));
        assert!(!l.completed);
        assert!(!l.unmark_completed_by("b"));
    }
}
