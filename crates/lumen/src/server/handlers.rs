//! Request handlers for the upload endpoints.
//!
//! Handlers collect multipart fields, hand them to the pipeline, and map
//! every failure to a uniform 500 response; the per-stage distinction lives
//! only in the server log.

use super::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lumen_core::{BatchOutcome, CaptionedUpload, PipelineError, UploadFile};
use serde_json::json;

/// Liveness check.
pub async fn index() -> &'static str {
    "Hello, World!"
}

/// Wrapper that maps every pipeline failure to a generic 500 response.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal server error" })),
        )
            .into_response()
    }
}

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError(PipelineError::Validation {
        message: format!("malformed multipart request: {err}"),
    })
}

fn missing_field(field: &str) -> ApiError {
    ApiError(PipelineError::Validation {
        message: format!("missing '{field}' field"),
    })
}

async fn read_file_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<UploadFile, ApiError> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content = field.bytes().await.map_err(bad_multipart)?.to_vec();
    Ok(UploadFile { filename, content })
}

/// `POST /upload` - multipart fields `file` and `name`.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CaptionedUpload>, ApiError> {
    let mut name = String::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "name" => name = field.text().await.map_err(bad_multipart)?,
            "file" => file = Some(read_file_field(field).await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| missing_field("file"))?;
    let result = state.pipeline.upload_single(&name, file).await?;
    Ok(Json(result))
}

/// `POST /upload_multiple` - multipart fields `files` (repeated) and `name`.
pub async fn upload_multiple(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchOutcome>, ApiError> {
    let mut name = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "name" => name = field.text().await.map_err(bad_multipart)?,
            "files" => files.push(read_file_field(field).await?),
            _ => {}
        }
    }

    let outcome = state.pipeline.upload_batch(&name, files).await?;
    Ok(Json(outcome))
}
