//! # Container Decoding
//!
//! Reads a `DWPv1` buffer back into its manifest and samples. The encoder is
//! the only producer this service has, so decoding exists mainly to inspect
//! uploaded containers and to check the format in tests.
//!
//! ## Rust Concepts:
//! - **Cursor<&[u8]>**: Tracks the read position over a borrowed buffer
//! - **ReadBytesExt**: byteorder's extension trait for reading fixed-size integers
//! - **Slicing**: `&bytes[start..end]` borrows a region without copying

use super::error::FormatError;
use super::{Sample, MAGIC};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// The logical contents of a decoded container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerParts {
    /// Parsed manifest JSON
    pub manifest: serde_json::Value,

    /// Samples in container order
    pub samples: Vec<Sample>,
}

/// Decode a complete container.
///
/// ## Validation:
/// 1. **Magic**: The first 5 bytes must be `DWPv1`
/// 2. **Lengths**: Every declared region must fit in the remaining bytes
/// 3. **Manifest**: Must parse as JSON
/// 4. **Names**: Must be valid UTF-8 (content itself is not checked)
/// 5. **End**: No bytes may follow the last sample record
///
/// ## Returns:
/// - **Ok(ContainerParts)**: Manifest and samples in their original order
/// - **Err(FormatError)**: The first problem found
pub fn decode(bytes: &[u8]) -> Result<ContainerParts, FormatError> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(FormatError::BadMagic);
    }

    let mut cursor = Cursor::new(bytes);
    cursor.set_position(MAGIC.len() as u64);

    let declared = read_len(&mut cursor, "manifest length")?;
    let json = take(&mut cursor, declared).ok_or(FormatError::TruncatedManifest {
        declared,
        available: remaining(&cursor),
    })?;
    let manifest: serde_json::Value =
        serde_json::from_slice(json).map_err(FormatError::InvalidJson)?;

    let count = read_len(&mut cursor, "sample count")?;
    // Cap the pre-allocation: a corrupt count must not reserve gigabytes.
    let mut samples = Vec::with_capacity(count.min(remaining(&cursor) / 8));

    for index in 0..count {
        let name_len = read_sample_len(&mut cursor, index)?;
        let name_bytes = take(&mut cursor, name_len).ok_or(FormatError::TruncatedSample {
            index,
            declared: name_len,
            available: remaining(&cursor),
        })?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|source| FormatError::InvalidName { index, source })?;

        let data_len = read_sample_len(&mut cursor, index)?;
        let data = take(&mut cursor, data_len).ok_or(FormatError::TruncatedSample {
            index,
            declared: data_len,
            available: remaining(&cursor),
        })?;

        samples.push(Sample::new(name, data));
    }

    let trailing = remaining(&cursor);
    if trailing > 0 {
        return Err(FormatError::TrailingBytes { count: trailing });
    }

    Ok(ContainerParts { manifest, samples })
}

/// Read a u32 LE length field from the header region.
fn read_len(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<usize, FormatError> {
    cursor
        .read_u32::<LittleEndian>()
        .map(|len| len as usize)
        .map_err(|_| FormatError::TruncatedHeader { field })
}

/// Read a u32 LE length field inside a sample record.
fn read_sample_len(cursor: &mut Cursor<&[u8]>, index: usize) -> Result<usize, FormatError> {
    let available = remaining(cursor);
    cursor
        .read_u32::<LittleEndian>()
        .map(|len| len as usize)
        .map_err(|_| FormatError::TruncatedSample {
            index,
            declared: 4,
            available,
        })
}

/// Borrow the next `len` bytes and advance, or `None` if fewer remain.
fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Option<&'a [u8]> {
    let bytes: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let end = start.checked_add(len)?;
    let slice = bytes.get(start..end)?;
    cursor.set_position(end as u64);
    Some(slice)
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor.get_ref().len().saturating_sub(cursor.position() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::encode;
    use serde_json::json;

    fn sample_container() -> Vec<u8> {
        let manifest = json!({"programName": "Lead1", "zones": [{"root": 60}]});
        let samples = vec![
            Sample::new("kick.wav", vec![0u8, 1, 2]),
            Sample::new("snare.wav", vec![3u8; 20]),
            Sample::new("empty.wav", Vec::new()),
        ];
        encode(&manifest, &samples).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_manifest_and_samples() {
        let manifest = json!({"programName": "Lead1", "tags": ["mono", "lead"], "tempo": 120.5});
        let samples = vec![
            Sample::new("b.wav", vec![2u8; 5]),
            Sample::new("a.wav", vec![1u8; 3]),
            Sample::new("b.wav", vec![4u8; 1]),
        ];

        let decoded = decode(&encode(&manifest, &samples).unwrap()).unwrap();

        assert_eq!(decoded.manifest, manifest);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn test_decode_empty_data_is_present_not_absent() {
        let bytes = encode(&json!({}), &[Sample::new("blank.wav", Vec::new())]).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.samples.len(), 1);
        assert_eq!(decoded.samples[0].name, "blank.wav");
        assert!(decoded.samples[0].data.is_empty());
    }

    #[test]
    fn test_decode_accepts_unusual_names() {
        let samples = vec![
            Sample::new("", vec![1u8]),
            Sample::new("../drums/kick.wav", vec![2u8]),
            Sample::new("ベース.wav", vec![3u8]),
        ];
        let decoded = decode(&encode(&json!({}), &samples).unwrap()).unwrap();
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn test_decode_every_proper_prefix_fails() {
        let bytes = sample_container();
        for len in 0..bytes.len() {
            assert!(
                decode(&bytes[..len]).is_err(),
                "prefix of {} bytes decoded successfully",
                len
            );
        }
    }

    #[test]
    fn test_decode_bad_magic() {
        let mut bytes = sample_container();
        bytes[0..5].copy_from_slice(b"DWPv2");
        assert!(matches!(decode(&bytes), Err(FormatError::BadMagic)));

        assert!(matches!(decode(b"DW"), Err(FormatError::BadMagic)));
        assert!(matches!(decode(b"RIFF\x00\x00\x00\x00WAVE"), Err(FormatError::BadMagic)));
    }

    #[test]
    fn test_decode_truncated_manifest() {
        let mut bytes = b"DWPv1".to_vec();
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(b"{}");

        assert!(matches!(
            decode(&bytes),
            Err(FormatError::TruncatedManifest { declared: 10, available: 2 })
        ));
    }

    #[test]
    fn test_decode_invalid_json() {
        let mut bytes = b"DWPv1".to_vec();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(b"{x}");
        bytes.extend_from_slice(&0u32.to_le_bytes());

        assert!(matches!(decode(&bytes), Err(FormatError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_invalid_utf8_name() {
        let mut bytes = b"DWPv1".to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(b"{}");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(&0u32.to_le_bytes());

        assert!(matches!(
            decode(&bytes),
            Err(FormatError::InvalidName { index: 0, .. })
        ));
    }

    #[test]
    fn test_decode_truncated_sample_data() {
        let mut bytes = encode(&json!({}), &[Sample::new("a.wav", vec![1u8; 8])]).unwrap();
        bytes.truncate(bytes.len() - 3);

        assert!(matches!(
            decode(&bytes),
            Err(FormatError::TruncatedSample { index: 0, declared: 8, available: 5 })
        ));
    }

    #[test]
    fn test_decode_huge_sample_count_fails_cleanly() {
        let mut bytes = b"DWPv1".to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(b"{}");
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            decode(&bytes),
            Err(FormatError::TruncatedSample { index: 0, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = sample_container();
        bytes.extend_from_slice(b"xyz");

        assert!(matches!(
            decode(&bytes),
            Err(FormatError::TrailingBytes { count: 3 })
        ));
    }
}
