use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::course::{CourseDetail, CreateCourseRequest, UpdateCourseRequest};
use crate::models::lesson::LessonView;
use crate::models::Course;
use crate::repositories::Repository;

pub struct CourseService {
    repository: Arc<dyn Repository>,
}

impl CourseService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Loads a course owned by `user_id`. Foreign courses look missing.
    pub async fn owned_course(&self, course_id: &str, user_id: &str) -> Result<Course, AppError> {
        self.repository
            .find_course(course_id)
            .await?
            .filter(|course| course.user_id == user_id)
            .ok_or(AppError::NotFoundOrNotOwned("Course"))
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Course>, AppError> {
        Ok(self.repository.list_courses(user_id).await?)
    }

    pub async fn create(&self, user_id: &str, req: CreateCourseRequest) -> Result<Course, AppError> {
        let now = Utc::now();
        let title = req.title.trim().to_string();
        let course = Course {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            topic: req
                .topic
                .filter(|topic| !topic.trim().is_empty())
                .unwrap_or_else(|| title.clone()),
            title,
            description: req.description,
            difficulty: req.difficulty,
            estimated_duration: req.estimated_duration,
            learning_objectives: req.learning_objectives,
            total_lessons: 0,
            completed_lessons: 0,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_course(&course).await?;

        tracing::info!(course_id = %course.id, user_id = %user_id, "Course created");
        Ok(course)
    }

    pub async fn detail(&self, course_id: &str, user_id: &str) -> Result<CourseDetail, AppError> {
        let course = self.owned_course(course_id, user_id).await?;
        let lessons = self
            .repository
            .list_lessons(course_id)
            .await?
            .into_iter()
            .map(|lesson| LessonView::for_user(lesson, user_id))
            .collect();
        let quizzes = self.repository.list_quizzes(course_id).await?;

        Ok(CourseDetail {
            course,
            lessons,
            quizzes,
        })
    }

    pub async fn update(
        &self,
        course_id: &str,
        user_id: &str,
        req: UpdateCourseRequest,
    ) -> Result<Course, AppError> {
        let mut course = self.owned_course(course_id, user_id).await?;

        if let Some(title) = req.title {
            course.title = title.trim().to_string();
        }
        if let Some(topic) = req.topic {
            course.topic = topic;
        }
        if let Some(description) = req.description {
            course.description = description;
        }
        if let Some(difficulty) = req.difficulty {
            course.difficulty = difficulty;
        }
        if let Some(estimated_duration) = req.estimated_duration {
            course.estimated_duration = estimated_duration;
        }
        if let Some(learning_objectives) = req.learning_objectives {
            course.learning_objectives = learning_objectives;
        }
        course.updated_at = Utc::now();

        self.repository.save_course(&course).await?;
        Ok(course)
    }

    /// Deletes the course with its lessons and quizzes.
    pub async fn delete(&self, course_id: &str, user_id: &str) -> Result<(), AppError> {
        let course = self.owned_course(course_id, user_id).await?;

        let lessons = self.repository.delete_lessons_for_course(&course.id).await?;
        let quizzes = self.repository.delete_quizzes_for_course(&course.id).await?;
        self.repository.delete_course(&course.id).await?;

        tracing::info!(
            course_id = %course.id,
            lessons_deleted = lessons,
            quizzes_deleted = quizzes,
            "Course deleted"
        );
        Ok(())
    }
}
