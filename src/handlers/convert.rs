//! Upload endpoint that turns a manifest plus sample files into a ZIP bundle.

use crate::bundle::{self, BUNDLE_FILENAME};
use crate::container::Sample;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use tracing::{debug, info};

/// Form field carrying the manifest JSON.
pub const MANIFEST_FIELD: &str = "manifest";

/// Form field carrying sample files (repeatable).
pub const SAMPLES_FIELD: &str = "samples";

/// Convert an uploaded program into a downloadable bundle.
///
/// ## Endpoint: `POST /api/convert`
///
/// ## Request:
/// Multipart form data with:
/// - `manifest`: JSON text (optional, defaults to `{}`)
/// - `samples`: any number of files, in the order they should be packed.
///   Parts without a filename are skipped.
///
/// ## Response:
/// `application/zip` attachment named `result.zip` containing
/// `<programName>.dwp`, `manifest.json` and `samples/<name>` entries.
pub async fn convert(state: web::Data<AppState>, mut payload: Multipart) -> AppResult<HttpResponse> {
    let limits = state.get_config().upload;

    let mut manifest = serde_json::json!({});
    let mut samples: Vec<Sample> = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::BadRequest("Missing content disposition".to_string()))?;
        let field_name = content_disposition.get_name().unwrap_or_default().to_string();
        let filename = content_disposition.get_filename().map(|s| s.to_string());

        match field_name.as_str() {
            MANIFEST_FIELD => {
                let bytes = read_field(&mut field, limits.max_manifest_bytes, "Manifest").await?;
                manifest = serde_json::from_slice(&bytes)?;
            }
            SAMPLES_FIELD => {
                let Some(name) = filename else {
                    debug!(field = %field_name, "Ignoring sample part without a filename");
                    continue;
                };
                if samples.len() >= limits.max_samples {
                    return Err(AppError::PayloadTooLarge(format!(
                        "Too many samples (max: {})",
                        limits.max_samples
                    )));
                }

                let data = read_field(&mut field, limits.max_sample_bytes, "Sample").await?;
                debug!(sample = %name, size_bytes = data.len(), "Received sample");
                samples.push(Sample::new(name, data));
            }
            other => {
                debug!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    let sample_count = samples.len();
    let bundle = web::block(move || bundle::build_bundle(&manifest, &samples))
        .await
        .map_err(|e| anyhow::anyhow!("conversion task failed: {}", e))??;

    state.record_conversion(sample_count, bundle.container_bytes);
    info!(
        program = %bundle.program_name,
        samples = sample_count,
        container_bytes = bundle.container_bytes,
        archive_bytes = bundle.archive.len(),
        "Converted program"
    );

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(BUNDLE_FILENAME.to_string())],
        })
        .body(bundle.archive))
}

/// Read a whole multipart field into memory, enforcing a size limit.
async fn read_field(field: &mut Field, limit: usize, what: &str) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "{} exceeds {} bytes",
                what, limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
