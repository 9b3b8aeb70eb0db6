//! # DWP Container Format
//!
//! Encoding and decoding of the `DWPv1` binary container that bundles a JSON
//! manifest with a list of named sample blobs.
//!
//! ## Wire Layout:
//! ```text
//! ┌────────────┬──────────────┬──────────────┬──────────────┬──────────────────────────┐
//! │ Magic (5B) │ JSON len     │ JSON bytes   │ Sample count │ Sample records (N times) │
//! │ "DWPv1"    │ (4B LE)      │ (len bytes)  │ (4B LE)      │                          │
//! └────────────┴──────────────┴──────────────┴──────────────┴──────────────────────────┘
//!
//! Sample record:
//! ┌──────────────┬────────────┬──────────────┬────────────┐
//! │ Name len     │ Name bytes │ Data len     │ Data bytes │
//! │ (4B LE)      │ (UTF-8)    │ (4B LE)      │ (raw)      │
//! └──────────────┴────────────┴──────────────┴────────────┘
//! ```
//!
//! ## Format Notes:
//! - The format is deliberately minimal: no checksums, no compression and no
//!   version negotiation beyond the literal magic tag.
//! - Sample names are not validated. Empty names, path separators and
//!   duplicates all survive a round trip.
//! - The manifest JSON is pretty-printed with 2-space indentation. Decoders
//!   must rely only on the length field, never on the whitespace.
//!
//! Both directions are pure functions over in-memory buffers. There is no
//! codec object to construct or tear down.

pub mod decoder;
pub mod encoder;
pub mod error;

pub use decoder::{decode, ContainerParts};
pub use encoder::encode;
pub use error::{EncodingError, FormatError};

/// Magic/version tag at the start of every container.
pub const MAGIC: &[u8; 5] = b"DWPv1";

/// Size in bytes of every length and count field.
pub const LEN_FIELD_SIZE: usize = 4;

/// File extension used for containers inside the download bundle.
pub const FILE_EXTENSION: &str = "dwp";

/// One named audio blob carried by the container.
///
/// ## Ownership:
/// The sample owns its bytes so handlers can move uploaded data straight into
/// it without copying. The codec only ever borrows samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Original filename of the upload (not sanitized)
    pub name: String,

    /// Raw sample bytes, possibly empty
    pub data: Vec<u8>,
}

impl Sample {
    /// Create a new sample from a name and its raw bytes.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Size of the sample data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the sample carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes this sample occupies inside a container (both length fields included).
    pub fn record_len(&self) -> usize {
        LEN_FIELD_SIZE + self.name.len() + LEN_FIELD_SIZE + self.data.len()
    }
}

/// Total container size for a manifest of `json_len` bytes and the given samples.
///
/// ## Formula:
/// `len(MAGIC) + 4 + json_len + 4 + Σ(4 + len(name) + 4 + len(data))`
pub fn encoded_len(json_len: usize, samples: &[Sample]) -> usize {
    MAGIC.len()
        + LEN_FIELD_SIZE
        + json_len
        + LEN_FIELD_SIZE
        + samples.iter().map(Sample::record_len).sum::<usize>()
}
