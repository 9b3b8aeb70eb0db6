//! Container inspection endpoint.
//!
//! Decodes a posted `.dwp` container and reports what it holds without
//! returning the sample data itself.

use crate::bundle;
use crate::container::{self, MAGIC};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::info;

/// Summary of one sample inside an inspected container.
#[derive(Debug, Serialize)]
pub struct SampleSummary {
    pub name: String,
    pub size_bytes: usize,
}

/// Response body for `POST /api/v1/inspect`.
#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub format: String,
    pub size_bytes: usize,
    pub program_name: String,
    pub manifest: serde_json::Value,
    pub sample_count: usize,
    pub samples: Vec<SampleSummary>,
    pub timestamp: String,
}

/// Decode a container and describe its contents.
///
/// ## Endpoint: `POST /api/v1/inspect`
///
/// ## Request:
/// Raw container bytes as the request body.
///
/// ## Errors:
/// - 400 `format_error` when the body is not a valid `DWPv1` container
/// - 413 when the body exceeds `upload.max_container_bytes`
pub async fn inspect_container(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let limit = state.get_config().upload.max_container_bytes;
    if body.len() > limit {
        return Err(AppError::PayloadTooLarge(format!(
            "Container exceeds {} bytes",
            limit
        )));
    }

    let parts = container::decode(&body)?;
    state.record_inspection();

    let program_name = bundle::program_name(&parts.manifest).to_string();
    info!(
        program = %program_name,
        samples = parts.samples.len(),
        size_bytes = body.len(),
        "Inspected container"
    );

    let samples = parts
        .samples
        .iter()
        .map(|sample| SampleSummary {
            name: sample.name.clone(),
            size_bytes: sample.len(),
        })
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(InspectResponse {
        format: String::from_utf8_lossy(MAGIC).into_owned(),
        size_bytes: body.len(),
        program_name,
        sample_count: samples.len(),
        samples,
        manifest: parts.manifest,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
