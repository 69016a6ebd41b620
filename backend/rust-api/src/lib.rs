use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod generation;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api/v1/auth", auth_routes(app_state.clone()))
        .route("/api/v1/contact", post(handlers::contact::submit_contact))
        // Protected endpoints (require JWT)
        .nest(
            "/api/v1",
            learning_routes().route_layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn learning_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Courses
        .route(
            "/courses",
            get(handlers::courses::list_courses).post(handlers::courses::create_course),
        )
        .route("/courses/generate", post(handlers::courses::generate_course))
        .route(
            "/courses/generate/template",
            post(handlers::courses::generate_template_course),
        )
        .route(
            "/courses/{id}",
            get(handlers::courses::get_course)
                .put(handlers::courses::update_course)
                .delete(handlers::courses::delete_course),
        )
        .route(
            "/courses/{id}/lessons",
            get(handlers::courses::list_course_lessons)
                .post(handlers::courses::create_course_lesson),
        )
        .route(
            "/courses/{id}/quizzes",
            get(handlers::courses::list_course_quizzes),
        )
        // Lessons
        .route(
            "/lessons/{id}",
            get(handlers::lessons::get_lesson)
                .put(handlers::lessons::update_lesson)
                .delete(handlers::lessons::delete_lesson),
        )
        .route(
            "/lessons/{id}/complete",
            patch(handlers::lessons::toggle_completion),
        )
        // Quizzes
        .route("/quizzes", post(handlers::quizzes::create_quiz))
        .route("/quizzes/{id}", get(handlers::quizzes::get_quiz))
        .route("/quizzes/{id}/submit", post(handlers::quizzes::submit_quiz))
        .route(
            "/quizzes/{id}/attempts",
            get(handlers::quizzes::list_attempts),
        )
        // Dashboard & settings
        .route("/users/dashboard", get(handlers::users::dashboard))
        .route("/users/settings", patch(handlers::users::update_settings))
}

fn auth_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/reset-password", post(handlers::auth::reset_password));

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_current_user))
        .route("/change-password", post(handlers::auth::change_password))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}
