//! Persistence collaborator: CRUD per entity, no cross-document transactions.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Attempt, Course, Lesson, Quiz, User};

pub mod memory;
pub mod mongo;

pub use memory::InMemoryRepository;
pub use mongo::MongoRepository;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, id: &str) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn save_user(&self, user: &User) -> Result<()>;

    async fn insert_course(&self, course: &Course) -> Result<()>;
    async fn find_course(&self, id: &str) -> Result<Option<Course>>;
    /// Newest first
    async fn list_courses(&self, user_id: &str) -> Result<Vec<Course>>;
    async fn save_course(&self, course: &Course) -> Result<()>;
    async fn delete_course(&self, id: &str) -> Result<()>;

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<()>;
    async fn find_lesson(&self, id: &str) -> Result<Option<Lesson>>;
    /// Ordered by `order`
    async fn list_lessons(&self, course_id: &str) -> Result<Vec<Lesson>>;
    async fn save_lesson(&self, lesson: &Lesson) -> Result<()>;
    async fn delete_lesson(&self, id: &str) -> Result<()>;
    async fn delete_lessons_for_course(&self, course_id: &str) -> Result<u64>;

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()>;
    async fn find_quiz(&self, id: &str) -> Result<Option<Quiz>>;
    /// Oldest first
    async fn list_quizzes(&self, course_id: &str) -> Result<Vec<Quiz>>;
    /// Appends to the quiz's attempt list without touching other fields
    async fn append_attempt(&self, quiz_id: &str, attempt: &Attempt) -> Result<()>;
    async fn delete_quizzes_for_course(&self, course_id: &str) -> Result<u64>;
}

fn sort_courses(courses: &mut [Course]) {
    courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn sort_lessons(lessons: &mut [Lesson]) {
    lessons.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

fn sort_quizzes(quizzes: &mut [Quiz]) {
    quizzes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}
