//! Axum route handler for CV upload and text extraction.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;
use crate::extract::{extract_text, resolve_format};
use crate::models::cv::CvDocument;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub cv: CvDocument,
    pub char_count: usize,
}

/// One uploaded file and what the client said about it.
#[derive(Debug, Default)]
pub struct Upload {
    pub bytes: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub format: Option<String>,
}

/// POST /api/v1/cv/extract
///
/// Multipart form: `file` (required) and `format` (optional, `pdf` | `docx`;
/// otherwise taken from the file name, then the part's content type).
pub async fn handle_extract_cv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let mut upload = Upload::default();
    let mut saw_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
                saw_file = true;
            }
            Some("format") => {
                let label = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid format field: {e}")))?;
                upload.format = Some(label);
            }
            other => debug!("Ignoring multipart field {other:?}"),
        }
    }

    if !saw_file {
        return Err(AppError::Validation(
            "multipart field 'file' is required".to_string(),
        ));
    }

    let cv = extract_upload(upload, state.config.max_upload_bytes).await?;
    let char_count = cv.raw_text.chars().count();
    Ok(Json(ExtractResponse { cv, char_count }))
}

/// Resolves the format and runs the CPU-bound parsers off the async executor.
/// The bytes are dropped when the blocking task finishes.
pub async fn extract_upload(upload: Upload, limit: usize) -> Result<CvDocument, AppError> {
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }
    if upload.bytes.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: upload.bytes.len(),
            limit,
        });
    }

    let format = resolve_format(
        upload.format.as_deref(),
        upload.file_name.as_deref(),
        upload.content_type.as_deref(),
    )?;

    let bytes = upload.bytes;
    let document = tokio::task::spawn_blocking(move || extract_text(&bytes, format))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))??;

    Ok(document)
}
