use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::lesson::{
    CreateLessonRequest, LessonView, UpdateLessonRequest, DEFAULT_LESSON_POINTS,
};
use crate::models::Lesson;
use crate::repositories::Repository;
use crate::services::course_service::CourseService;

pub struct LessonService {
    repository: Arc<dyn Repository>,
}

impl LessonService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    async fn owned_lesson(&self, lesson_id: &str, user_id: &str) -> Result<Lesson, AppError> {
        self.repository
            .find_lesson(lesson_id)
            .await?
            .filter(|lesson| lesson.user_id == user_id)
            .ok_or(AppError::NotFoundOrNotOwned("Lesson"))
    }

    pub async fn list(&self, course_id: &str, user_id: &str) -> Result<Vec<LessonView>, AppError> {
        CourseService::new(self.repository.clone())
            .owned_course(course_id, user_id)
            .await?;

        Ok(self
            .repository
            .list_lessons(course_id)
            .await?
            .into_iter()
            .map(|lesson| LessonView::for_user(lesson, user_id))
            .collect())
    }

    pub async fn get(&self, lesson_id: &str, user_id: &str) -> Result<LessonView, AppError> {
        let lesson = self.owned_lesson(lesson_id, user_id).await?;
        Ok(LessonView::for_user(lesson, user_id))
    }

    /// Adds a lesson at the end of the course unless an order is given.
    pub async fn create(
        &self,
        course_id: &str,
        user_id: &str,
        req: CreateLessonRequest,
    ) -> Result<Lesson, AppError> {
        let mut course = CourseService::new(self.repository.clone())
            .owned_course(course_id, user_id)
            .await?;

        let order = match req.order {
            Some(order) => order,
            None => {
                let existing = self.repository.list_lessons(course_id).await?;
                existing
                    .iter()
                    .map(|l| l.order)
                    .max()
                    .unwrap_or(0)
                    .checked_add(1)
                    .ok_or_else(|| {
                        AppError::InvalidInput(
                            "Lesson order is at its maximum, pass an explicit order".to_string(),
                        )
                    })?
            }
        };

        let now = Utc::now();
        let lesson = Lesson {
            id: Uuid::new_v4().to_string(),
            course_id: course.id.clone(),
            user_id: user_id.to_string(),
            title: req.title.trim().to_string(),
            content: req.content,
            order,
            points: req.points.unwrap_or(DEFAULT_LESSON_POINTS),
            duration: req.duration,
            video_search_term: req.video_search_term,
            completed: false,
            completed_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_lesson(&lesson).await?;

        course.record_lesson_added();
        self.repository.save_course(&course).await?;

        tracing::info!(lesson_id = %lesson.id, course_id = %course.id, order, "Lesson created");
        Ok(lesson)
    }

    pub async fn update(
        &self,
        lesson_id: &str,
        user_id: &str,
        req: UpdateLessonRequest,
    ) -> Result<Lesson, AppError> {
        let mut lesson = self.owned_lesson(lesson_id, user_id).await?;

        if let Some(title) = req.title {
            lesson.title = title.trim().to_string();
        }
        if let Some(content) = req.content {
            lesson.content = content;
        }
        if let Some(order) = req.order {
            lesson.order = order;
        }
        if let Some(points) = req.points {
            lesson.points = points;
        }
        if req.duration.is_some() {
            lesson.duration = req.duration;
        }
        if req.video_search_term.is_some() {
            lesson.video_search_term = req.video_search_term;
        }
        lesson.updated_at = Utc::now();

        self.repository.save_lesson(&lesson).await?;
        Ok(lesson)
    }

    /// Removes the lesson and shrinks the owning course's counters.
    pub async fn delete(&self, lesson_id: &str, user_id: &str) -> Result<(), AppError> {
        let lesson = self.owned_lesson(lesson_id, user_id).await?;
        self.repository.delete_lesson(&lesson.id).await?;

        match self.repository.find_course(&lesson.course_id).await? {
            Some(mut course) => {
                course.record_lesson_removed(lesson.is_completed_by(user_id));
                self.repository.save_course(&course).await?;
            }
            None => tracing::warn!(
                lesson_id = %lesson.id,
                course_id = %lesson.course_id,
                "Deleted lesson referenced a missing course"
            ),
        }

        tracing::info!(lesson_id = %lesson.id, "Lesson deleted");
        Ok(())
    }
}
