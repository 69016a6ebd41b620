use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::IndexOptions,
    Collection, Database, IndexModel,
};

use super::{sort_courses, sort_lessons, sort_quizzes, Repository};
use crate::metrics::track_db_operation;
use crate::models::{Attempt, Course, Lesson, Quiz, User};

const USERS: &str = "users";
const COURSES: &str = "courses";
const LESSONS: &str = "lessons";
const QUIZZES: &str = "quizzes";

pub struct MongoRepository {
    mongo: Database,
}

impl MongoRepository {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn users(&self) -> Collection<User> {
        self.mongo.collection(USERS)
    }

    fn courses(&self) -> Collection<Course> {
        self.mongo.collection(COURSES)
    }

    fn lessons(&self) -> Collection<Lesson> {
        self.mongo.collection(LESSONS)
    }

    fn quizzes(&self) -> Collection<Quiz> {
        self.mongo.collection(QUIZZES)
    }

    /// Unique email plus the foreign-key lookups used by every request.
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await
            .context("Failed to create users.email index")?;
        self.courses()
            .create_index(IndexModel::builder().keys(doc! { "userId": 1 }).build())
            .await
            .context("Failed to create courses.userId index")?;
        self.lessons()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "courseId": 1, "order": 1 })
                    .build(),
            )
            .await
            .context("Failed to create lessons.courseId index")?;
        self.quizzes()
            .create_index(IndexModel::builder().keys(doc! { "courseId": 1 }).build())
            .await
            .context("Failed to create quizzes.courseId index")?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl Repository for MongoRepository {
    async fn ping(&self) -> Result<()> {
        self.mongo
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        track_db_operation("insert", USERS, async {
            self.users()
                .insert_one(user)
                .await
                .context("Failed to insert user")?;
            Ok(())
        })
        .await
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        track_db_operation("find", USERS, async {
            self.users()
                .find_one(doc! { "_id": id })
                .await
                .context("Failed to query user")
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        track_db_operation("find", USERS, async {
            self.users()
                .find_one(doc! { "email": email })
                .await
                .context("Failed to query user by email")
        })
        .await
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        track_db_operation("replace", USERS, async {
            self.users()
                .replace_one(doc! { "_id": &user.id }, user)
                .await
                .context("Failed to update user")?;
            Ok(())
        })
        .await
    }

    async fn insert_course(&self, course: &Course) -> Result<()> {
        track_db_operation("insert", COURSES, async {
            self.courses()
                .insert_one(course)
                .await
                .context("Failed to insert course")?;
            Ok(())
        })
        .await
    }

    async fn find_course(&self, id: &str) -> Result<Option<Course>> {
        track_db_operation("find", COURSES, async {
            self.courses()
                .find_one(doc! { "_id": id })
                .await
                .context("Failed to query course")
        })
        .await
    }

    async fn list_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        track_db_operation("find", COURSES, async {
            let cursor = self
                .courses()
                .find(doc! { "userId": user_id })
                .await
                .context("Failed to query courses")?;
            let mut courses: Vec<Course> = cursor
                .try_collect()
                .await
                .context("Failed to collect courses")?;
            sort_courses(&mut courses);
            Ok(courses)
        })
        .await
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        track_db_operation("replace", COURSES, async {
            self.courses()
                .replace_one(doc! { "_id": &course.id }, course)
                .await
                .context("Failed to update course")?;
            Ok(())
        })
        .await
    }

    async fn delete_course(&self, id: &str) -> Result<()> {
        track_db_operation("delete", COURSES, async {
            self.courses()
                .delete_one(doc! { "_id": id })
                .await
                .context("Failed to delete course")?;
            Ok(())
        })
        .await
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<()> {
        track_db_operation("insert", LESSONS, async {
            self.lessons()
                .insert_one(lesson)
                .await
                .context("Failed to insert lesson")?;
            Ok(())
        })
        .await
    }

    async fn find_lesson(&self, id: &str) -> Result<Option<Lesson>> {
        track_db_operation("find", LESSONS, async {
            self.lessons()
                .find_one(doc! { "_id": id })
                .await
                .context("Failed to query lesson")
        })
        .await
    }

    async fn list_lessons(&self, course_id: &str) -> Result<Vec<Lesson>> {
        track_db_operation("find", LESSONS, async {
            let cursor = self
                .lessons()
                .find(doc! { "courseId": course_id })
                .await
                .context("Failed to query lessons")?;
            let mut lessons: Vec<Lesson> = cursor
                .try_collect()
                .await
                .context("Failed to collect lessons")?;
            sort_lessons(&mut lessons);
            Ok(lessons)
        })
        .await
    }

    async fn save_lesson(&self, lesson: &Lesson) -> Result<()> {
        track_db_operation("replace", LESSONS, async {
            self.lessons()
                .replace_one(doc! { "_id": &lesson.id }, lesson)
                .await
                .context("Failed to update lesson")?;
            Ok(())
        })
        .await
    }

    async fn delete_lesson(&self, id: &str) -> Result<()> {
        track_db_operation("delete", LESSONS, async {
            self.lessons()
                .delete_one(doc! { "_id": id })
                .await
                .context("Failed to delete lesson")?;
            Ok(())
        })
        .await
    }

    async fn delete_lessons_for_course(&self, course_id: &str) -> Result<u64> {
        track_db_operation("delete", LESSONS, async {
            let result = self
                .lessons()
                .delete_many(doc! { "courseId": course_id })
                .await
                .context("Failed to delete course lessons")?;
            Ok(result.deleted_count)
        })
        .await
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        track_db_operation("insert", QUIZZES, async {
            self.quizzes()
                .insert_one(quiz)
                .await
                .context("Failed to insert quiz")?;
            Ok(())
        })
        .await
    }

    async fn find_quiz(&self, id: &str) -> Result<Option<Quiz>> {
        track_db_operation("find", QUIZZES, async {
            self.quizzes()
                .find_one(doc! { "_id": id })
                .await
                .context("Failed to query quiz")
        })
        .await
    }

    async fn list_quizzes(&self, course_id: &str) -> Result<Vec<Quiz>> {
        track_db_operation("find", QUIZZES, async {
            let cursor = self
                .quizzes()
                .find(doc! { "courseId": course_id })
                .await
                .context("Failed to query quizzes")?;
            let mut quizzes: Vec<Quiz> = cursor
                .try_collect()
                .await
                .context("Failed to collect quizzes")?;
            sort_quizzes(&mut quizzes);
            Ok(quizzes)
        })
        .await
    }

    async fn append_attempt(&self, quiz_id: &str, attempt: &Attempt) -> Result<()> {
        track_db_operation("push", QUIZZES, async {
            let attempt_bson = to_bson(attempt).context("Failed to serialize attempt")?;
            self.quizzes()
                .update_one(
                    doc! { "_id": quiz_id },
                    doc! { "$push": { "attempts": attempt_bson } },
                )
                .await
                .context("Failed to append quiz attempt")?;
            Ok(())
        })
        .await
    }

    async fn delete_quizzes_for_course(&self, course_id: &str) -> Result<u64> {
        track_db_operation("delete", QUIZZES, async {
            let result = self
                .quizzes()
                .delete_many(doc! { "courseId": course_id })
                .await
                .context("Failed to delete course quizzes")?;
            Ok(result.deleted_count)
        })
        .await
    }
}
