use axum::response::IntoResponse;

use crate::services::render_metrics;

/// Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    render_metrics()
}
