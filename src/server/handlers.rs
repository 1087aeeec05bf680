//! HTTP handlers for the invoice parsing API.

use super::AppState;
use crate::core::error::{ApiError, UploadError};
use crate::invoice::{ExtractResponse, Invoice};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

/// Liveness message on `GET /`.
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Invoice Parsing API is running." }))
}

/// `POST /extract`
///
/// Accepts a multipart form with a `userID` text field and a `file`
/// upload, extracts the document's text and parses it into an invoice.
pub async fn extract_invoice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let form = read_extract_form(multipart).await?;

    info!(
        %request_id,
        user_id = %form.user_id,
        filename = %form.filename,
        size = form.data.len(),
        "processing upload"
    );

    let text = state.extractor.extract(&form.filename, form.data).await?;
    let payload = state.parser.parse(&text).await?;
    let invoice = Invoice::from_payload(payload)?;

    info!(%request_id, "invoice parsed");

    Ok(Json(ExtractResponse {
        user_id: form.user_id,
        invoice,
    }))
}

/// The two fields `POST /extract` requires.
struct ExtractForm {
    user_id: String,
    filename: String,
    data: Bytes,
}

/// Walk the multipart stream once, collecting `userID` and `file`.
///
/// Unknown fields are skipped. A missing required field is a 422, a field
/// that cannot be read is a 400.
async fn read_extract_form(mut multipart: Multipart) -> Result<ExtractForm, UploadError> {
    let mut user_id = None;
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) =
        multipart
            .next_field()
            .await
            .map_err(|err| UploadError::UnreadableField {
                field: "form".to_string(),
                message: err.to_string(),
            })?
    {
        // field.name() borrows from the field, so copy it out before the
        // body reads below consume it.
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "userID" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| UploadError::UnreadableField {
                        field: "userID".to_string(),
                        message: err.to_string(),
                    })?;
                user_id = Some(value);
            }
            "file" => {
                let filename = field
                    .file_name()
                    .map(str::to_owned)
                    .unwrap_or_else(|| "upload".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| UploadError::UnreadableField {
                        field: "file".to_string(),
                        message: err.to_string(),
                    })?;
                upload = Some((filename, data));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or(UploadError::MissingField { field: "userID" })?;
    let (filename, data) = upload.ok_or(UploadError::MissingField { field: "file" })?;

    Ok(ExtractForm {
        user_id,
        filename,
        data,
    })
}
