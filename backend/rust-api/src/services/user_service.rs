use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::user::{ActivityEntry, DashboardResponse, UpdateSettingsRequest, UserProfile};
use crate::models::User;
use crate::repositories::Repository;

pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Last `RECENT_ACTIVITY_DAYS` days ending at `today`, oldest first, with
/// days without activity reported as zero.
pub fn recent_activity(user: &User, today: NaiveDate) -> Vec<ActivityEntry> {
    (0..RECENT_ACTIVITY_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            ActivityEntry {
                date,
                lessons_completed: user
                    .activity_on(date)
                    .map(|entry| entry.lessons_completed)
                    .unwrap_or(0),
            }
        })
        .collect()
}

pub struct UserService {
    repository: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    async fn user(&self, user_id: &str) -> Result<User, AppError> {
        self.repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))
    }

    pub async fn dashboard(&self, user_id: &str) -> Result<DashboardResponse, AppError> {
        let user = self.user(user_id).await?;
        let courses = self.repository.list_courses(user_id).await?;

        let mut quizzes_taken = 0;
        for course in &courses {
            quizzes_taken += self
                .repository
                .list_quizzes(&course.id)
                .await?
                .iter()
                .filter(|quiz| quiz.has_attempt_by(user_id))
                .count() as u32;
        }

        Ok(DashboardResponse {
            total_points: user.total_points,
            current_streak: user.current_streak,
            longest_streak: user.longest_streak,
            last_activity_date: user.last_activity_date,
            total_courses: courses.len() as u32,
            total_lessons: courses.iter().map(|c| c.total_lessons).sum(),
            completed_lessons: courses.iter().map(|c| c.completed_lessons).sum(),
            quizzes_taken,
            recent_activity: recent_activity(&user, Utc::now().date_naive()),
        })
    }

    pub async fn update_settings(
        &self,
        user_id: &str,
        req: UpdateSettingsRequest,
    ) -> Result<UserProfile, AppError> {
        let mut user = self.user(user_id).await?;

        if let Some(name) = req.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::InvalidInput("Name cannot be blank".to_string()));
            }
            user.name = name.to_string();
        }
        if let Some(theme) = req.theme {
            user.theme = theme;
        }
        user.updated_at = Utc::now();

        self.repository.save_user(&user).await?;
        tracing::info!(user_id = %user.id, "Settings updated");
        Ok(UserProfile::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Theme;

    #[test]
    fn recent_activity_is_zero_filled_and_ordered() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let user = User {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            password_hash: String::new(),
            name: "Ann".to_string(),
            theme: Theme::Dark,
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            activity_log: vec![
                ActivityEntry {
                    date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
                    lessons_completed: 2,
                },
                ActivityEntry {
                    date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                    lessons_completed: 9,
                },
            ],
            password_reset: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let activity = recent_activity(&user, today);
        assert_eq!(activity.len(), 7);
        assert_eq!(activity[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(activity[6].date, today);
        assert_eq!(activity[5].lessons_completed, 2);
        assert_eq!(activity.iter().map(|a| a.lessons_completed).sum::<u32>(), 2);
    }
}
