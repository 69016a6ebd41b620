pub mod contact;
pub mod course;
pub mod generation;
pub mod lesson;
pub mod quiz;
pub mod user;

pub use course::{Course, Difficulty};
pub use lesson::Lesson;
pub use quiz::{Attempt, Quiz};
pub use user::User;
