//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "trimiq_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "trimiq_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "trimiq_http_requests_in_flight";

    // Pipeline metrics
    pub const JOBS_STARTED_TOTAL: &str = "trimiq_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "trimiq_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "trimiq_jobs_failed_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "trimiq_pipeline_duration_seconds";
    pub const TRANSCRIBE_DURATION_SECONDS: &str = "trimiq_transcribe_duration_seconds";

    // Billing metrics
    pub const MINUTES_BILLED: &str = "trimiq_minutes_billed";

    // Cleanup metrics
    pub const OUTPUTS_DELETED_TOTAL: &str = "trimiq_outputs_deleted_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "trimiq_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a job accepted for processing.
pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

/// Record a completed pipeline run.
pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// Record a failed pipeline run.
pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
}

/// Record total pipeline wall time.
pub fn record_pipeline_duration(duration_secs: f64) {
    histogram!(names::PIPELINE_DURATION_SECONDS).record(duration_secs);
}

/// Record whisper transcription wall time.
pub fn record_transcribe_duration(duration_secs: f64) {
    histogram!(names::TRANSCRIBE_DURATION_SECONDS).record(duration_secs);
}

/// Record minutes debited from a user balance.
pub fn record_minutes_billed(minutes: f64) {
    histogram!(names::MINUTES_BILLED).record(minutes);
}

/// Record an expired output deletion.
pub fn record_output_deleted() {
    counter!(names::OUTPUTS_DELETED_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/jobs/[a-zA-Z0-9_-]+")
        .unwrap()
        .replace_all(path, "/jobs/:job_id");
    let path = regex_lite::Regex::new(
        r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .unwrap()
    .replace_all(&path, ":id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/jobs/550e8400-e29b-41d4-a716-446655440000"),
            "/api/jobs/:job_id"
        );
        assert_eq!(sanitize_path("/api/balance"), "/api/balance");
    }
}
