pub mod analytics;
pub mod classification;
pub mod dataset;
pub mod elasticity;
pub mod forecast;
pub mod health;
pub mod imports;

use crate::errors::AppError;

/// Runs CPU-bound analysis off the async workers
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("analysis task failed: {}", e)))?
}

/// `text/csv` attachment response
pub(crate) fn csv_attachment(filename: &str, body: String) -> axum::response::Response {
    use axum::http::header;
    use axum::response::IntoResponse;

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}
