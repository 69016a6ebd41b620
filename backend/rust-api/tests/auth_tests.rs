use axum::http::{Method, StatusCode};
use regex::Regex;
use serde_json::json;
use skillpath_api::services::auth_service::MAX_RESET_CODE_ATTEMPTS;

mod common;

use common::TestApp;

async fn login(app: &TestApp, email: &str, password: &str) -> StatusCode {
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
    status
}

fn reset_code(html: &str) -> String {
    let pattern = Regex::new(r">(\d{6})<").unwrap();
    pattern.captures(html).unwrap()[1].to_string()
}

#[tokio::test]
async fn test_register_and_fetch_profile() {
    let app = common::create_test_app();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "Alice@Example.com", "password": "password123", "name": "Alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["totalPoints"], 0);
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, me) = app
        .request(Method::GET, "/api/v1/auth/me", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Alice");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = common::create_test_app();
    app.register("bob@example.com", "password123").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "BOB@example.com", "password": "password123", "name": "Bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn test_register_validation() {
    let app = common::create_test_app();

    for payload in [
        json!({ "email": "not-an-email", "password": "password123", "name": "X" }),
        json!({ "email": "short@example.com", "password": "short", "name": "X" }),
        json!({ "email": "noname@example.com", "password": "password123", "name": "" }),
    ] {
        let (status, _) = app
            .request(Method::POST, "/api/v1/auth/register", None, Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = common::create_test_app();
    app.register("carol@example.com", "password123").await;

    assert_eq!(login(&app, "carol@example.com", "password123").await, StatusCode::OK);
    assert_eq!(login(&app, "CAROL@example.com", "password123").await, StatusCode::OK);
    assert_eq!(
        login(&app, "carol@example.com", "wrongpass1").await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&app, "nobody@example.com", "password123").await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = common::create_test_app();

    let (status, _) = app
        .request(Method::GET, "/api/v1/auth/me", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/v1/courses", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = common::create_test_app();
    let token = app.register("dave@example.com", "password123").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "wrongpass1", "newPassword": "newpassword1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "password123", "newPassword": "newpassword1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        login(&app, "dave@example.com", "password123").await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(login(&app, "dave@example.com", "newpassword1").await, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = common::create_test_app();
    app.register("erin@example.com", "password123").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            None,
            Some(json!({ "email": "erin@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "erin@example.com");
    let code = reset_code(&sent[0].html_body);

    let wrong_code = if code == "000000" { "111111" } else { "000000" };
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            None,
            Some(json!({ "email": "erin@example.com", "code": wrong_code, "newPassword": "resetpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset code");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            None,
            Some(json!({ "email": "erin@example.com", "code": code, "newPassword": "resetpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login(&app, "erin@example.com", "resetpass1").await, StatusCode::OK);

    // Codes are single use
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            None,
            Some(json!({ "email": "erin@example.com", "code": code, "newPassword": "another12" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forgot_password_for_unknown_email_sends_nothing() {
    let app = common::create_test_app();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("If an account exists"));
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_forgot_password_reports_mail_failure() {
    let app = common::create_test_app();
    app.register("frank@example.com", "password123").await;
    app.mailer.fail_deliveries();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            None,
            Some(json!({ "email": "frank@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_reset_code_is_discarded_after_repeated_wrong_guesses() {
    let app = common::create_test_app();
    app.register("guess@example.com", "password123").await;
    app.request(
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "guess@example.com" })),
    )
    .await;
    let code = reset_code(&app.mailer.sent()[0].html_body);
    let wrong_code = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..MAX_RESET_CODE_ATTEMPTS {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/v1/auth/reset-password",
                None,
                Some(json!({ "email": "guess@example.com", "code": wrong_code, "newPassword": "guessed12" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            None,
            Some(json!({ "email": "guess@example.com", "code": code, "newPassword": "resetpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset code");
    assert_eq!(login(&app, "guess@example.com", "password123").await, StatusCode::OK);
}

#[tokio::test]
async fn test_a_few_wrong_guesses_keep_the_code_valid() {
    let app = common::create_test_app();
    app.register("typo@example.com", "password123").await;
    app.request(
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "typo@example.com" })),
    )
    .await;
    let code = reset_code(&app.mailer.sent()[0].html_body);
    let wrong_code = if code == "000000" { "111111" } else { "000000" };

    for _ in 1..MAX_RESET_CODE_ATTEMPTS {
        app.request(
            Method::POST,
            "/api/v1/auth/reset-password",
            None,
            Some(json!({ "email": "typo@example.com", "code": wrong_code, "newPassword": "guessed12" })),
        )
        .await;
    }

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            None,
            Some(json!({ "email": "typo@example.com", "code": code, "newPassword": "resetpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
