use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::{self, QUIZ_SUBMISSIONS_TOTAL};
use crate::models::quiz::{AnswerDetail, CreateQuizRequest, Question, QuizSubmissionResult};
use crate::models::{Attempt, Quiz};
use crate::repositories::Repository;

pub const QUIZ_COMPLETION_POINTS: u32 = 20;

/// Case-insensitive comparison of trimmed answers
pub fn answers_match(submitted: &str, expected: &str) -> bool {
    submitted.trim().to_lowercase() == expected.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub correct: u32,
    pub percentage: u32,
    pub details: Vec<AnswerDetail>,
}

/// Scores answers against the questions, matched by position.
pub fn grade(questions: &[Question], answers: &[String]) -> Grade {
    let details: Vec<AnswerDetail> = questions
        .iter()
        .zip(answers)
        .enumerate()
        .map(|(index, (question, answer))| AnswerDetail {
            question_index: index as u32,
            selected_answer: answer.clone(),
            is_correct: answers_match(answer, &question.correct_answer),
        })
        .collect();

    let correct = details.iter().filter(|d| d.is_correct).count() as u32;
    let percentage = if questions.is_empty() {
        0
    } else {
        (f64::from(correct) / questions.len() as f64 * 100.0).round() as u32
    };

    Grade {
        correct,
        percentage,
        details,
    }
}

pub struct QuizService {
    repository: Arc<dyn Repository>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    async fn owned_quiz(&self, quiz_id: &str, user_id: &str) -> Result<Quiz, AppError> {
        self.repository
            .find_quiz(quiz_id)
            .await?
            .filter(|quiz| quiz.user_id == user_id)
            .ok_or(AppError::NotFoundOrNotOwned("Quiz"))
    }

    pub async fn create(&self, user_id: &str, req: CreateQuizRequest) -> Result<Quiz, AppError> {
        let course = self
            .repository
            .find_course(&req.course_id)
            .await?
            .filter(|course| course.user_id == user_id)
            .ok_or(AppError::NotFoundOrNotOwned("Course"))?;

        if let Some(index) = req
            .questions
            .iter()
            .position(|q| q.question.trim().is_empty() || q.correct_answer.trim().is_empty())
        {
            return Err(AppError::InvalidInput(format!(
                "Question {} needs both a question and a correct answer",
                index + 1
            )));
        }

        let quiz = Quiz {
            id: Uuid::new_v4().to_string(),
            course_id: course.id,
            user_id: user_id.to_string(),
            title: req.title.trim().to_string(),
            description: req.description,
            max_score: req.score.unwrap_or(req.questions.len() as u32 * 10),
            questions: req.questions,
            attempts: Vec::new(),
            created_at: Utc::now(),
        };
        self.repository.insert_quiz(&quiz).await?;

        tracing::info!(quiz_id = %quiz.id, course_id = %quiz.course_id, "Quiz created");
        Ok(quiz)
    }

    pub async fn get(&self, quiz_id: &str, user_id: &str) -> Result<Quiz, AppError> {
        self.owned_quiz(quiz_id, user_id).await
    }

    pub async fn list_for_course(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Vec<Quiz>, AppError> {
        self.repository
            .find_course(course_id)
            .await?
            .filter(|course| course.user_id == user_id)
            .ok_or(AppError::NotFoundOrNotOwned("Course"))?;

        Ok(self.repository.list_quizzes(course_id).await?)
    }

    /// Grades a submission and appends it as a new attempt.
    ///
    /// Points are granted only when the user had no earlier attempt. The
    /// check and the append are separate writes, so two simultaneous first
    /// submissions can both be rewarded.
    pub async fn submit(
        &self,
        quiz_id: &str,
        user_id: &str,
        answers: Vec<String>,
    ) -> Result<QuizSubmissionResult, AppError> {
        let quiz = self.owned_quiz(quiz_id, user_id).await?;

        if answers.len() != quiz.questions.len() {
            return Err(AppError::AnswerCountMismatch {
                expected: quiz.questions.len(),
                received: answers.len(),
            });
        }

        let already_completed = quiz.has_attempt_by(user_id);
        let graded = grade(&quiz.questions, &answers);

        let attempt = Attempt {
            user_id: user_id.to_string(),
            score: graded.percentage,
            total_questions: quiz.questions.len() as u32,
            answers: graded.details.clone(),
            completed_at: Utc::now(),
        };
        self.repository.append_attempt(&quiz.id, &attempt).await?;

        let points_awarded = if already_completed {
            0
        } else {
            let mut user = self
                .repository
                .find_user(user_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;
            user.add_points(QUIZ_COMPLETION_POINTS);
            user.updated_at = Utc::now();
            self.repository.save_user(&user).await?;
            metrics::record_points_awarded(QUIZ_COMPLETION_POINTS);
            QUIZ_COMPLETION_POINTS
        };

        QUIZ_SUBMISSIONS_TOTAL
            .with_label_values(&[if already_completed { "false" } else { "true" }])
            .inc();
        tracing::info!(
            quiz_id = %quiz.id,
            user_id = %user_id,
            percentage = graded.percentage,
            correct = graded.correct,
            points_awarded,
            already_completed,
            "Quiz submitted"
        );

        Ok(QuizSubmissionResult {
            percentage: graded.percentage,
            correct_answers: graded.correct,
            total_questions: quiz.questions.len() as u32,
            points_awarded,
            already_completed,
            results: graded.details,
        })
    }

    /// The caller's attempts, oldest first
    pub async fn list_attempts(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> Result<Vec<Attempt>, AppError> {
        let quiz = self.owned_quiz(quiz_id, user_id).await?;
        Ok(quiz
            .attempts
            .into_iter()
            .filter(|attempt| attempt.user_id == user_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(answers: &[&str]) -> Vec<Question> {
        answers
            .iter()
            .enumerate()
            .map(|(i, answer)| Question {
                question: format!("Q{}", i + 1),
                options: vec![],
                correct_answer: answer.to_string(),
                explanation: None,
            })
            .collect()
    }

    fn owned(answers: &[&str]) -> Vec<String> {
        answers.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn matching_ignores_case_and_surrounding_whitespace() {
        assert!(answers_match("  hands-ON practice ", "Hands-on practice"));
        assert!(!answers_match("Hands on practice", "Hands-on practice"));
    }

    #[test]
    fn half_correct_scores_fifty() {
        let graded = grade(
            &questions(&["a", "b", "c", "d"]),
            &owned(&["A", "x", "c", "y"]),
        );
        assert_eq!(graded.correct, 2);
        assert_eq!(graded.percentage, 50);
        assert_eq!(
            graded.details.iter().map(|d| d.is_correct).collect::<Vec<_>>(),
            vec![true, false, true, false]
        );
    }

    #[test]
    fn percentage_is_rounded() {
        let graded = grade(&questions(&["a", "b", "c"]), &owned(&["a", "b", "x"]));
        assert_eq!(graded.percentage, 67);
        let graded = grade(&questions(&["a", "b", "c"]), &owned(&["a", "x", "x"]));
        assert_eq!(graded.percentage, 33);
    }

    #[test]
    fn grading_is_deterministic() {
        let qs = questions(&["a", "b"]);
        let answers = owned(&["a", "c"]);
        assert_eq!(grade(&qs, &answers), grade(&qs, &answers));
    }

    #[test]
    fn empty_quiz_scores_zero() {
        assert_eq!(grade(&[], &[]).percentage, 0);
    }
}
