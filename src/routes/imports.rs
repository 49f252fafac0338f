use std::path::PathBuf;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::routes::run_blocking;
use crate::services::csv_import_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(import_csv))
        .route("/files", get(list_csv_files))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub file_path: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub source: String,
    pub records_loaded: usize,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub errors: Vec<String>,
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct CsvFileInfo {
    pub name: String,
    pub path: String,
}

/// Relative paths are looked up in the data directory
fn resolve_path(state: &AppState, file_path: &str) -> PathBuf {
    let path = PathBuf::from(file_path);
    if path.is_relative() && !path.exists() {
        state.data_dir.join(path)
    } else {
        path
    }
}

pub async fn import_csv(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    info!("POST /api/imports - Importing {}", req.file_path);

    if req.file_path.trim().is_empty() {
        return Err(AppError::Validation("file_path is required".to_string()));
    }

    let path = resolve_path(&state, &req.file_path);
    if !path.is_file() {
        warn!("Import file not found: {:?}", path);
        return Err(AppError::NotFound);
    }

    let load_path = path.clone();
    let result = run_blocking(move || {
        csv_import_service::load_sales_csv(&load_path).map_err(AppError::from)
    })
    .await?;

    if result.records.is_empty() {
        return Err(AppError::Import(format!(
            "No valid records in {:?} ({} rows read, {} dropped)",
            path, result.rows_read, result.rows_dropped
        )));
    }

    let records_loaded = result.records.len();
    let fingerprint = state.store.replace(result.records, Some(path.clone()));

    Ok(Json(ImportResponse {
        source: path.display().to_string(),
        records_loaded,
        rows_read: result.rows_read,
        rows_dropped: result.rows_dropped,
        errors: result.errors,
        fingerprint: format!("{:016x}", fingerprint),
    }))
}

pub async fn list_csv_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<CsvFileInfo>>, AppError> {
    info!("GET /api/imports/files - Listing available CSV files");

    if !state.data_dir.exists() {
        error!("Data directory {:?} does not exist", state.data_dir);
        return Ok(Json(vec![]));
    }

    let files = csv_import_service::list_csv_files(&state.data_dir)?
        .into_iter()
        .map(|name| CsvFileInfo {
            path: state.data_dir.join(&name).display().to_string(),
            name,
        })
        .collect();

    Ok(Json(files))
}
