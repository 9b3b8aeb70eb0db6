//! # Download Bundle
//!
//! Packages a converted program into the ZIP archive returned by `/api/convert`.
//!
//! ## Archive Layout:
//! ```text
//! result.zip
//! ├── <programName>.dwp     encoded container
//! ├── manifest.json         the manifest, pretty-printed
//! └── samples/
//!     └── <name>            each original sample
//! ```
//!
//! Entries are stored uncompressed. Audio rarely shrinks much under deflate,
//! and stored entries keep packaging cost linear in the upload size.

use crate::container::{self, Sample, FILE_EXTENSION};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Manifest key that names the output program.
pub const PROGRAM_NAME_KEY: &str = "programName";

/// Program name used when the manifest does not provide one.
pub const DEFAULT_PROGRAM_NAME: &str = "program";

/// Filename offered to the client for the archive.
pub const BUNDLE_FILENAME: &str = "result.zip";

/// A finished bundle ready to send to the client.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Program name taken from the manifest (or the default)
    pub program_name: String,

    /// Size of the encoded container inside the archive
    pub container_bytes: usize,

    /// The complete ZIP archive
    pub archive: Vec<u8>,
}

/// Read the program name from a manifest.
///
/// ## Fallback:
/// Returns `"program"` when `programName` is missing, not a string, or empty.
pub fn program_name(manifest: &serde_json::Value) -> &str {
    manifest
        .get(PROGRAM_NAME_KEY)
        .and_then(|v| v.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_PROGRAM_NAME)
}

/// Encode the container and package it with the manifest and samples.
///
/// ## Errors:
/// - Container encoding failures (wrapped with context)
/// - ZIP writer failures
pub fn build_bundle(manifest: &serde_json::Value, samples: &[Sample]) -> Result<Bundle> {
    let program_name = program_name(manifest).to_string();
    let container = container::encode(manifest, samples).context("failed to encode container")?;
    let manifest_json =
        serde_json::to_vec_pretty(manifest).context("failed to serialize manifest.json")?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(
        format!("{}.{}", program_name, FILE_EXTENSION),
        entry_options(container.len()),
    )?;
    zip.write_all(&container)?;

    zip.start_file("manifest.json", entry_options(manifest_json.len()))?;
    zip.write_all(&manifest_json)?;

    for (name, data) in archive_samples(samples) {
        zip.start_file(format!("samples/{}", name), entry_options(data.len()))
            .with_context(|| format!("failed to add sample '{}' to archive", name))?;
        zip.write_all(data)?;
    }

    let archive = zip.finish().context("failed to finish archive")?.into_inner();

    Ok(Bundle {
        program_name,
        container_bytes: container.len(),
        archive,
    })
}

/// Options for a stored entry of `len` bytes.
///
/// The ZIP writer refuses to write more than `u32::MAX` bytes to an entry
/// unless it was started as a ZIP64 entry, and a container built from many
/// large samples can pass that size even though every field fits in a u32.
fn entry_options(len: usize) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(needs_zip64(len))
}

fn needs_zip64(len: usize) -> bool {
    len as u64 > u64::from(u32::MAX)
}

/// Collapse samples to one archive entry per name.
///
/// A ZIP archive can only hold one entry per path, so when names repeat the
/// last sample's data wins. Entries keep the position of the first occurrence.
fn archive_samples(samples: &[Sample]) -> Vec<(&str, &[u8])> {
    let mut entries: Vec<(&str, &[u8])> = Vec::with_capacity(samples.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for sample in samples {
        match positions.get(sample.name.as_str()) {
            Some(&pos) => entries[pos].1 = sample.data.as_slice(),
            None => {
                positions.insert(sample.name.as_str(), entries.len());
                entries.push((sample.name.as_str(), sample.data.as_slice()));
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entry(archive: &[u8], name: &str) -> Vec<u8> {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = zip.by_name(name).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        contents
    }

    fn entry_names(archive: &[u8]) -> Vec<String> {
        let zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        zip.file_names().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_program_name_fallbacks() {
        assert_eq!(program_name(&json!({"programName": "Lead1"})), "Lead1");
        assert_eq!(program_name(&json!({})), "program");
        assert_eq!(program_name(&json!({"programName": ""})), "program");
        assert_eq!(program_name(&json!({"programName": 42})), "program");
        assert_eq!(program_name(&json!([1, 2, 3])), "program");
    }

    #[test]
    fn test_bundle_contains_container_manifest_and_samples() {
        let manifest = json!({"programName": "Lead1"});
        let samples = vec![
            Sample::new("kick.wav", vec![0u8, 1, 2]),
            Sample::new("snare.wav", vec![5u8; 12]),
        ];

        let bundle = build_bundle(&manifest, &samples).unwrap();

        let mut names = entry_names(&bundle.archive);
        names.sort();
        assert_eq!(
            names,
            vec!["Lead1.dwp", "manifest.json", "samples/kick.wav", "samples/snare.wav"]
        );
        assert_eq!(bundle.program_name, "Lead1");

        let container_bytes = read_entry(&bundle.archive, "Lead1.dwp");
        assert_eq!(container_bytes.len(), bundle.container_bytes);
        let decoded = container::decode(&container_bytes).unwrap();
        assert_eq!(decoded.manifest, manifest);
        assert_eq!(decoded.samples, samples);

        assert_eq!(read_entry(&bundle.archive, "samples/kick.wav"), vec![0u8, 1, 2]);
    }

    #[test]
    fn test_bundle_manifest_json_matches_container_manifest() {
        let manifest = json!({"programName": "Pad", "zones": [{"root": 60, "lo": 0, "hi": 127}]});
        let bundle = build_bundle(&manifest, &[]).unwrap();

        let from_file: serde_json::Value =
            serde_json::from_slice(&read_entry(&bundle.archive, "manifest.json")).unwrap();
        let from_container = container::decode(&read_entry(&bundle.archive, "Pad.dwp"))
            .unwrap()
            .manifest;

        assert_eq!(from_file, from_container);
    }

    #[test]
    fn test_bundle_uses_default_program_name() {
        let bundle = build_bundle(&json!({}), &[]).unwrap();
        assert_eq!(bundle.program_name, "program");
        assert!(entry_names(&bundle.archive).contains(&"program.dwp".to_string()));
    }

    #[test]
    fn test_zip64_only_for_entries_past_u32() {
        assert!(!needs_zip64(0));
        assert!(!needs_zip64(64 * 1024 * 1024));
        assert!(!needs_zip64(u32::MAX as usize));
        #[cfg(target_pointer_width = "64")]
        {
            assert!(needs_zip64(u32::MAX as usize + 1));
            assert!(needs_zip64(8 * 1024 * 1024 * 1024));
        }
    }

    #[test]
    fn test_zip64_entry_options_still_readable() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(true);
        zip.start_file("big.dwp", options).unwrap();
        zip.write_all(b"DWPv1").unwrap();
        let archive = zip.finish().unwrap().into_inner();

        assert_eq!(read_entry(&archive, "big.dwp"), b"DWPv1".to_vec());
    }

    #[test]
    fn test_duplicate_sample_names_keep_last_data() {
        let samples = vec![
            Sample::new("hit.wav", vec![1u8]),
            Sample::new("other.wav", vec![2u8]),
            Sample::new("hit.wav", vec![3u8, 3]),
        ];

        let bundle = build_bundle(&json!({}), &samples).unwrap();

        assert_eq!(read_entry(&bundle.archive, "samples/hit.wav"), vec![3u8, 3]);
        let sample_entries = entry_names(&bundle.archive)
            .into_iter()
            .filter(|n| n.starts_with("samples/"))
            .count();
        assert_eq!(sample_entries, 2);

        // The container itself still carries every sample.
        let decoded = container::decode(&read_entry(&bundle.archive, "program.dwp")).unwrap();
        assert_eq!(decoded.samples.len(), 3);
    }
}
