use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

mod common;

use common::{TestApp, TEMPLATE_ANSWERS};

async fn submit(app: &TestApp, token: &str, quiz_id: &str, answers: &[&str]) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        &format!("/api/v1/quizzes/{}/submit", quiz_id),
        Some(token),
        Some(json!({ "answers": answers })),
    )
    .await
}

#[tokio::test]
async fn test_first_submission_awards_points() {
    let app = common::create_test_app();
    let token = app.register("quiz@example.com", "password123").await;
    let generated = app.template_course(&token, "Python", 3).await;
    let quiz_id = generated["quiz"]["_id"].as_str().unwrap();

    let (status, body) = submit(&app, &token, quiz_id, &TEMPLATE_ANSWERS).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["percentage"], 100);
    assert_eq!(body["correctAnswers"], 5);
    assert_eq!(body["totalQuestions"], 5);
    assert_eq!(body["pointsAwarded"], 20);
    assert_eq!(body["alreadyCompleted"], false);
    assert_eq!(body["results"].as_array().unwrap().len(), 5);

    let (_, me) = app
        .request(Method::GET, "/api/v1/auth/me", Some(&token), None)
        .await;
    assert_eq!(me["totalPoints"], 20);
}

#[tokio::test]
async fn test_resubmission_records_attempt_without_points() {
    let app = common::create_test_app();
    let token = app.register("retake@example.com", "password123").await;
    let generated = app.template_course(&token, "Python", 3).await;
    let quiz_id = generated["quiz"]["_id"].as_str().unwrap();

    submit(&app, &token, quiz_id, &TEMPLATE_ANSWERS).await;

    let mut answers = TEMPLATE_ANSWERS;
    answers[0] = "wrong";
    answers[1] = "  PRACTICE CONSISTENTLY ";
    let (status, body) = submit(&app, &token, quiz_id, &answers).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyCompleted"], true);
    assert_eq!(body["pointsAwarded"], 0);
    assert_eq!(body["correctAnswers"], 4);
    assert_eq!(body["percentage"], 80);
    assert_eq!(body["results"][0]["isCorrect"], false);
    assert_eq!(body["results"][1]["isCorrect"], true);

    let (status, attempts) = app
        .request(
            Method::GET,
            &format!("/api/v1/quizzes/{}/attempts", quiz_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let attempts = attempts.as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["score"], 100);
    assert_eq!(attempts[1]["score"], 80);

    let (_, me) = app
        .request(Method::GET, "/api/v1/auth/me", Some(&token), None)
        .await;
    assert_eq!(me["totalPoints"], 20);

    let (_, dashboard) = app
        .request(Method::GET, "/api/v1/users/dashboard", Some(&token), None)
        .await;
    assert_eq!(dashboard["quizzesTaken"], 1);
}

#[tokio::test]
async fn test_answer_count_mismatch_is_rejected() {
    let app = common::create_test_app();
    let token = app.register("mismatch@example.com", "password123").await;
    let generated = app.template_course(&token, "Python", 3).await;
    let quiz_id = generated["quiz"]["_id"].as_str().unwrap();

    let (status, body) = submit(&app, &token, quiz_id, &TEMPLATE_ANSWERS[..4]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["expected"], 5);
    assert_eq!(body["details"]["received"], 4);

    let (_, attempts) = app
        .request(
            Method::GET,
            &format!("/api/v1/quizzes/{}/attempts", quiz_id),
            Some(&token),
            None,
        )
        .await;
    assert!(attempts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_other_users_quiz_is_not_found() {
    let app = common::create_test_app();
    let owner = app.register("quizowner@example.com", "password123").await;
    let intruder = app.register("quizintruder@example.com", "password123").await;
    let generated = app.template_course(&owner, "Python", 3).await;
    let quiz_id = generated["quiz"]["_id"].as_str().unwrap();

    let (status, _) = submit(&app, &intruder, quiz_id, &TEMPLATE_ANSWERS).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/quizzes/{}", quiz_id),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_quiz_creation() {
    let app = common::create_test_app();
    let token = app.register("author@example.com", "password123").await;
    let generated = app.template_course(&token, "Python", 3).await;
    let course_id = generated["course"]["_id"].as_str().unwrap();

    let (status, quiz) = app
        .request(
            Method::POST,
            "/api/v1/quizzes",
            Some(&token),
            Some(json!({
                "courseId": course_id,
                "title": "Extra quiz",
                "questions": [
                    { "question": "2 + 2?", "options": ["3", "4"], "correctAnswer": "4" },
                    { "question": "Capital of France?", "options": ["Paris", "Rome"], "correctAnswer": "Paris" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", quiz);
    assert_eq!(quiz["score"], 20);

    let (_, quizzes) = app
        .request(
            Method::GET,
            &format!("/api/v1/courses/{}/quizzes", course_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(quizzes.as_array().unwrap().len(), 2);

    let (status, body) = submit(&app, &token, quiz["_id"].as_str().unwrap(), &["4", "rome"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["percentage"], 50);
    assert_eq!(body["pointsAwarded"], 20);
}
