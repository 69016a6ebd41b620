use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::{self, LESSON_TOGGLES_TOTAL};
use crate::models::lesson::{CompletionAction, ToggleCompletionResponse};
use crate::models::user::ActivityEntry;
use crate::models::User;
use crate::repositories::Repository;

pub const LESSON_COMPLETION_POINTS: u32 = 5;

/// Awards points for a completion and logs it against `today`.
/// The streak is only recomputed for the first completion of a day.
pub fn record_completion(user: &mut User, today: NaiveDate) {
    user.add_points(LESSON_COMPLETION_POINTS);

    match user.activity_on_mut(today) {
        Some(entry) => entry.lessons_completed += 1,
        None => {
            user.activity_log.push(ActivityEntry {
                date: today,
                lessons_completed: 1,
            });
            update_streak(user, today);
        }
    }
    user.updated_at = Utc::now();
}

/// Reverses the points and today's count. Streaks are left alone.
pub fn record_uncompletion(user: &mut User, today: NaiveDate) {
    user.deduct_points(LESSON_COMPLETION_POINTS);

    if let Some(entry) = user.activity_on_mut(today) {
        entry.lessons_completed = entry.lessons_completed.saturating_sub(1);
    }
    user.updated_at = Utc::now();
}

pub fn update_streak(user: &mut User, today: NaiveDate) {
    match user.last_activity_date {
        Some(last) if last == today => {}
        Some(last) if Some(last) == today.pred_opt() => user.current_streak += 1,
        _ => user.current_streak = 1,
    }
    user.longest_streak = user.longest_streak.max(user.current_streak);
    user.last_activity_date = Some(today);
}

pub struct ProgressService {
    repository: Arc<dyn Repository>,
}

impl ProgressService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub async fn toggle_lesson_completion(
        &self,
        lesson_id: &str,
        user_id: &str,
        is_completing: bool,
    ) -> Result<ToggleCompletionResponse, AppError> {
        self.toggle_lesson_completion_on(lesson_id, user_id, is_completing, Utc::now().date_naive())
            .await
    }

    /// Same as `toggle_lesson_completion` with an explicit calendar day (UTC).
    ///
    /// Lesson, course and user are written one after the other without a
    /// transaction, and two concurrent completions can both award points.
    pub async fn toggle_lesson_completion_on(
        &self,
        lesson_id: &str,
        user_id: &str,
        is_completing: bool,
        today: NaiveDate,
    ) -> Result<ToggleCompletionResponse, AppError> {
        let mut lesson = self
            .repository
            .find_lesson(lesson_id)
            .await?
            .filter(|lesson| lesson.user_id == user_id)
            .ok_or(AppError::NotFoundOrNotOwned("Lesson"))?;
        let mut user = self
            .repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

        let was_completed = lesson.is_completed_by(user_id);
        if was_completed == is_completing {
            LESSON_TOGGLES_TOTAL
                .with_label_values(&[CompletionAction::NoChange.as_str()])
                .inc();
            tracing::debug!(lesson_id = %lesson_id, user_id = %user_id, "Lesson toggle is a no-op");
            return Ok(ToggleCompletionResponse {
                lesson,
                is_completed: was_completed,
                points_change: 0,
                total_points: user.total_points,
                action: CompletionAction::NoChange,
            });
        }

        let mut course = self.repository.find_course(&lesson.course_id).await?;
        if course.is_none() {
            tracing::warn!(
                lesson_id = %lesson_id,
                course_id = %lesson.course_id,
                "Lesson references a missing course, course progress not updated"
            );
        }

        let (action, points_change) = if is_completing {
            lesson.mark_completed_by(user_id);
            if let Some(course) = course.as_mut() {
                course.record_lesson_completed();
            }
            record_completion(&mut user, today);
            metrics::record_points_awarded(LESSON_COMPLETION_POINTS);
            (CompletionAction::Completed, LESSON_COMPLETION_POINTS as i32)
        } else {
            lesson.unmark_completed_by(user_id);
            if let Some(course) = course.as_mut() {
                course.record_lesson_uncompleted();
            }
            record_uncompletion(&mut user, today);
            (CompletionAction::Unmarked, -(LESSON_COMPLETION_POINTS as i32))
        };

        self.repository.save_lesson(&lesson).await?;
        if let Some(course) = &course {
            self.repository.save_course(course).await?;
        }
        self.repository.save_user(&user).await?;

        LESSON_TOGGLES_TOTAL
            .with_label_values(&[action.as_str()])
            .inc();
        tracing::info!(
            lesson_id = %lesson_id,
            user_id = %user_id,
            action = action.as_str(),
            points_change,
            total_points = user.total_points,
            current_streak = user.current_streak,
            "Lesson completion toggled"
        );

        Ok(ToggleCompletionResponse {
            lesson,
            is_completed: is_completing,
            points_change,
            total_points: user.total_points,
            action,
        })
    }
}
