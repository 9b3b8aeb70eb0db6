//! # Container Encoding
//!
//! Serializes a manifest and an ordered list of samples into a `DWPv1` buffer.
//!
//! ## Process:
//! 1. Pretty-print the manifest as JSON (2-space indentation)
//! 2. Check that every length fits in a u32 field
//! 3. Allocate the exact output size and write the fields in order
//!
//! Checking before writing means a failure never leaves half a container behind.

use super::error::EncodingError;
use super::{encoded_len, Sample, LEN_FIELD_SIZE, MAGIC};
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

/// Encode a manifest and its samples into a container.
///
/// ## Parameters:
/// - **manifest**: Any JSON-serializable value (normally a `serde_json::Value` object)
/// - **samples**: Samples in the order they should appear in the container
///
/// ## Returns:
/// - **Ok(Vec<u8>)**: The complete container
/// - **Err(EncodingError)**: The manifest is not serializable, or a field is too
///   large for its 4-byte length prefix
///
/// ## Determinism:
/// The same manifest and samples always produce the same bytes, because the
/// JSON serializer settings are fixed here.
pub fn encode<M>(manifest: &M, samples: &[Sample]) -> Result<Vec<u8>, EncodingError>
where
    M: Serialize + ?Sized,
{
    let json = serde_json::to_vec_pretty(manifest)?;

    let json_len = checked_len("manifest", json.len())?;
    let sample_count = checked_len("sample count", samples.len())?;
    let mut record_lens = Vec::with_capacity(samples.len());
    for sample in samples {
        let name_len = checked_len("sample name", sample.name.len())?;
        let data_len = checked_len("sample data", sample.data.len())?;
        record_lens.push((name_len, data_len));
    }

    let mut out = Vec::with_capacity(encoded_len(json.len(), samples));
    out.extend_from_slice(MAGIC);
    put_len(&mut out, json_len);
    out.extend_from_slice(&json);
    put_len(&mut out, sample_count);

    for (sample, (name_len, data_len)) in samples.iter().zip(record_lens) {
        put_len(&mut out, name_len);
        out.extend_from_slice(sample.name.as_bytes());
        put_len(&mut out, data_len);
        out.extend_from_slice(&sample.data);
    }

    tracing::trace!(
        manifest_bytes = json.len(),
        samples = samples.len(),
        total_bytes = out.len(),
        "Encoded container"
    );

    Ok(out)
}

/// Convert a length to its u32 field value, failing if it does not fit.
fn checked_len(field: &'static str, len: usize) -> Result<u32, EncodingError> {
    u32::try_from(len).map_err(|_| EncodingError::FieldTooLarge { field, len })
}

/// Append a little-endian u32 length field.
fn put_len(out: &mut Vec<u8>, value: u32) {
    let mut field = [0u8; LEN_FIELD_SIZE];
    LittleEndian::write_u32(&mut field, value);
    out.extend_from_slice(&field);
}
