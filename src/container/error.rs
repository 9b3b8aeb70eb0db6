//! Error types for the container codec.
//!
//! Encoding and decoding fail in unrelated ways, so each direction gets its
//! own enum. Neither is retried or recovered inside the codec.

use std::str::Utf8Error;

/// Failures while building a container.
///
/// Every length is checked before the first byte is written, so an error
/// never comes with a partially built buffer.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// The manifest could not be serialized to JSON.
    #[error("manifest is not serializable to JSON: {0}")]
    Manifest(#[from] serde_json::Error),

    /// A field is longer than a 4-byte length prefix can describe.
    #[error("{field} is {len} bytes, exceeding the 4-byte length field")]
    FieldTooLarge { field: &'static str, len: usize },
}

/// Failures while reading a container.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The buffer does not start with `DWPv1`.
    #[error("bad magic: expected \"DWPv1\"")]
    BadMagic,

    /// A 4-byte length or count field was cut short.
    #[error("truncated header: missing {field} field")]
    TruncatedHeader { field: &'static str },

    /// Fewer manifest bytes remain than the length field declares.
    #[error("truncated manifest: declared {declared} bytes, {available} available")]
    TruncatedManifest { declared: usize, available: usize },

    /// The manifest bytes are not valid JSON.
    #[error("invalid JSON in manifest: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// A sample record is shorter than its declared lengths.
    #[error("truncated sample record {index}: declared {declared} bytes, {available} available")]
    TruncatedSample {
        index: usize,
        declared: usize,
        available: usize,
    },

    /// A sample name is not valid UTF-8.
    #[error("sample record {index} has a name that is not valid UTF-8")]
    InvalidName {
        index: usize,
        #[source]
        source: Utf8Error,
    },

    /// Bytes remain after the last declared sample.
    #[error("{count} trailing bytes after the last sample record")]
    TrailingBytes { count: usize },
}
