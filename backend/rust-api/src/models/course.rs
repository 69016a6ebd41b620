use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::lesson::LessonView;
use super::quiz::Quiz;

/// Course document stored in the "courses" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub topic: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub completed_lessons: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Counts one more completed lesson, never exceeding `total_lessons`.
    pub fn record_lesson_completed(&mut self) {
        self.completed_lessons = (self.completed_lessons + 1).min(self.total_lessons);
        self.updated_at = Utc::now();
    }

    pub fn record_lesson_uncompleted(&mut self) {
        self.completed_lessons = self.completed_lessons.saturating_sub(1);
        self.updated_at = Utc::now();
    }

    pub fn record_lesson_added(&mut self) {
        self.total_lessons += 1;
        self.updated_at = Utc::now();
    }

    pub fn record_lesson_removed(&mut self, was_completed: bool) {
        self.total_lessons = self.total_lessons.saturating_sub(1);
        if was_completed {
            self.completed_lessons = self.completed_lessons.saturating_sub(1);
        }
        self.completed_lessons = self.completed_lessons.min(self.total_lessons);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!(
                "Invalid difficulty '{}': expected beginner, intermediate or advanced",
                other
            )),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// POST /api/v1/courses/generate and /generate/template
///
/// Difficulty and lesson count are kept loosely typed so that out-of-range
/// values surface as `InvalidInput` instead of a body deserialization error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCourseRequest {
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_number_of_lessons")]
    pub number_of_lessons: i64,
}

fn default_difficulty() -> String {
    Difficulty::Beginner.as_str().to_string()
}

fn default_number_of_lessons() -> i64 {
    5
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub estimated_duration: Option<String>,
    pub learning_objectives: Option<Vec<String>>,
}

/// Course returned by the generation endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: Course,
    pub lessons_count: usize,
    pub quiz_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedCourseResponse {
    pub course: CourseSummary,
    pub lessons: Vec<super::lesson::Lesson>,
    pub quiz: Quiz,
}

/// GET /api/v1/courses/{id}
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    pub course: Course,
    pub lessons: Vec<LessonView>,
    pub quizzes: Vec<Quiz>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(total: u32, completed: u32) -> Course {
        Course {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            title: "Rust".to_string(),
            topic: "Rust".to_string(),
            description: String::new(),
            difficulty: Difficulty::Beginner,
            estimated_duration: String::new(),
            learning_objectives: vec![],
            total_lessons: total,
            completed_lessons: completed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completed_lessons_stay_within_bounds() {
        let mut c = course(2, 2);
        c.record_lesson_completed();
        assert_eq!(c.completed_lessons, 2);

        let mut c = course(2, 0);
        c.record_lesson_uncompleted();
        assert_eq!(c.completed_lessons, 0);
    }

    #[test]
    fn removing_completed_lesson_adjusts_both_counts() {
        let mut c = course(3, 2);
        c.record_lesson_removed(true);
        assert_eq!((c.total_lessons, c.completed_lessons), (2, 1));

        let mut c = course(1, 1);
        c.record_lesson_removed(false);
        assert_eq!((c.total_lessons, c.completed_lessons), (0, 0));
    }

    #[test]
    fn difficulty_parses_only_known_values() {
        assert_eq!("advanced".parse::<Difficulty>(), Ok(Difficulty::Advanced));
        assert!("expert".parse::<Difficulty>().is_err());
        assert!("Beginner".parse::<Difficulty>().is_err());
    }
}
