use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::docx::LogoAsset;
use crate::errors::AppError;
use crate::state::AppState;
use crate::upload::pipeline::{self, DOCX_CONTENT_TYPE};

/// POST /upload/
/// Multipart form with two file parts: `file` (resume, .pdf or .docx)
/// and `logo` (.png/.jpg/.jpeg). Returns the redacted, logo-stamped
/// DOCX as an attachment.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();

    let mut resume: Option<(String, Bytes)> = None;
    let mut logo: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await? {
        let part_name = field.name().map(str::to_string);
        match part_name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("Missing resume filename".to_string()))?;
                resume = Some((filename, field.bytes().await?));
            }
            Some("logo") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("Missing logo filename".to_string()))?;
                logo = Some((filename, field.bytes().await?));
            }
            _ => {} // unknown parts are ignored
        }
    }

    let (file_name, file_bytes) =
        resume.ok_or_else(|| AppError::Validation("Missing 'file' part".to_string()))?;
    let (logo_name, logo_bytes) =
        logo.ok_or_else(|| AppError::Validation("Missing 'logo' part".to_string()))?;
    info!(%request_id, file = %file_name, logo = %logo_name, "received upload");

    let logo_asset = LogoAsset::from_upload(&logo_name, logo_bytes.to_vec())
        .ok_or_else(|| AppError::Validation("Unsupported logo format".to_string()))?;
    pipeline::validate_resume_name(&file_name)?;

    // conversion and package surgery are blocking work; keep them off
    // the async workers
    let patterns = state.patterns.clone();
    let is_pdf = pipeline::is_pdf(&file_name);
    let output = tokio::task::spawn_blocking(move || {
        let docx_bytes = if is_pdf {
            pipeline::bridge_pdf(&file_bytes)?
        } else {
            file_bytes.to_vec()
        };
        pipeline::process_docx(&docx_bytes, &logo_asset, &patterns)
    })
    .await
    .map_err(anyhow::Error::new)??;

    let filename = pipeline::output_filename(&file_name);
    info!(%request_id, %filename, bytes = output.len(), "returning redacted document");

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        output,
    )
        .into_response())
}
