use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{sort_courses, sort_lessons, sort_quizzes, Repository};
use crate::models::{Attempt, Course, Lesson, Quiz, User};

/// Process-local store for development runs and tests.
///
/// Each collection has its own lock, so like the MongoDB backend it is
/// atomic per document only.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<String, User>>,
    courses: RwLock<HashMap<String, Course>>,
    lessons: RwLock<HashMap<String, Lesson>>,
    quizzes: RwLock<HashMap<String, Quiz>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(anyhow!("Duplicate key: users.email {}", user.email));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn insert_course(&self, course: &Course) -> Result<()> {
        self.courses
            .write()
            .await
            .insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn find_course(&self, id: &str) -> Result<Option<Course>> {
        Ok(self.courses.read().await.get(id).cloned())
    }

    async fn list_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        let mut courses: Vec<Course> = self
            .courses
            .read()
            .await
            .values()
            .filter(|course| course.user_id == user_id)
            .cloned()
            .collect();
        sort_courses(&mut courses);
        Ok(courses)
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        self.courses
            .write()
            .await
            .insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn delete_course(&self, id: &str) -> Result<()> {
        self.courses.write().await.remove(id);
        Ok(())
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.lessons
            .write()
            .await
            .insert(lesson.id.clone(), lesson.clone());
        Ok(())
    }

    async fn find_lesson(&self, id: &str) -> Result<Option<Lesson>> {
        Ok(self.lessons.read().await.get(id).cloned())
    }

    async fn list_lessons(&self, course_id: &str) -> Result<Vec<Lesson>> {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .read()
            .await
            .values()
            .filter(|lesson| lesson.course_id == course_id)
            .cloned()
            .collect();
        sort_lessons(&mut lessons);
        Ok(lessons)
    }

    async fn save_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.lessons
            .write()
            .await
            .insert(lesson.id.clone(), lesson.clone());
        Ok(())
    }

    async fn delete_lesson(&self, id: &str) -> Result<()> {
        self.lessons.write().await.remove(id);
        Ok(())
    }

    async fn delete_lessons_for_course(&self, course_id: &str) -> Result<u64> {
        let mut lessons = self.lessons.write().await;
        let before = lessons.len();
        lessons.retain(|_, lesson| lesson.course_id != course_id);
        Ok((before - lessons.len()) as u64)
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.quizzes
            .write()
            .await
            .insert(quiz.id.clone(), quiz.clone());
        Ok(())
    }

    async fn find_quiz(&self, id: &str) -> Result<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn list_quizzes(&self, course_id: &str) -> Result<Vec<Quiz>> {
        let mut quizzes: Vec<Quiz> = self
            .quizzes
            .read()
            .await
            .values()
            .filter(|quiz| quiz.course_id == course_id)
            .cloned()
            .collect();
        sort_quizzes(&mut quizzes);
        Ok(quizzes)
    }

    async fn append_attempt(&self, quiz_id: &str, attempt: &Attempt) -> Result<()> {
        let mut quizzes = self.quizzes.write().await;
        let quiz = quizzes
            .get_mut(quiz_id)
            .ok_or_else(|| anyhow!("Quiz {} not found", quiz_id))?;
        quiz.attempts.push(attempt.clone());
        Ok(())
    }

    async fn delete_quizzes_for_course(&self, course_id: &str) -> Result<u64> {
        let mut quizzes = self.quizzes.write().await;
        let before = quizzes.len();
        quizzes.retain(|_, quiz| quiz.course_id != course_id);
        Ok((before - quizzes.len()) as u64)
    }
}
