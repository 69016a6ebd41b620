use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Generation pipeline
    pub static ref GENERATION_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "generation_attempts_total",
        "Calls made to the text generation API",
        &["outcome"]
    )
    .unwrap();

    pub static ref COURSES_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "courses_generated_total",
        "Courses created by the generation endpoints",
        &["mode"]
    )
    .unwrap();

    pub static ref JSON_REPAIR_PASSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "json_repair_passes_total",
        "Parse pass that accepted the generated JSON",
        &["pass"]
    )
    .unwrap();

    // Business Metrics
    pub static ref LESSON_TOGGLES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lesson_toggles_total",
        "Lesson completion toggles by resulting action",
        &["action"]
    )
    .unwrap();

    pub static ref QUIZ_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_submissions_total",
        "Quiz submissions",
        &["first_attempt"]
    )
    .unwrap();

    pub static ref POINTS_AWARDED_TOTAL: IntCounter = register_int_counter!(
        "points_awarded_total",
        "Points granted for lesson completions and first quiz attempts"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

pub fn record_generation_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    GENERATION_ATTEMPTS_TOTAL
        .with_label_values(&[outcome])
        .inc();
}

pub fn record_points_awarded(points: u32) {
    POINTS_AWARDED_TOTAL.inc_by(u64::from(points));
}
