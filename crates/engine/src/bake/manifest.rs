use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::atomic_io::{write_json_atomic, AtomicJsonError};

pub(crate) const BAKE_FORMAT_VERSION: u16 = 1;
pub(crate) const MANIFEST_FILE_NAME: &str = "bake.manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct BakeManifest {
    pub format_version: u16,
    pub tool_version: String,
    pub input_hash_sha256_hex: String,
}

#[derive(Debug, Clone)]
pub(crate) enum ManifestReadState {
    Missing,
    Unreadable,
    Present(BakeManifest),
}

pub(crate) fn read_manifest(path: &Path) -> io::Result<ManifestReadState> {
    if !path.exists() {
        return Ok(ManifestReadState::Missing);
    }

    let raw = fs::read_to_string(path)?;
    Ok(match serde_json::from_str::<BakeManifest>(&raw) {
        Ok(manifest) => ManifestReadState::Present(manifest),
        Err(_) => ManifestReadState::Unreadable,
    })
}

pub(crate) fn write_manifest_atomic(
    path: &Path,
    manifest: &BakeManifest,
) -> Result<(), AtomicJsonError> {
    write_json_atomic(path, manifest)
}

/// Why a cached bake cannot be reused, or `None` when it can.
pub(crate) fn manifest_mismatch(
    found: &BakeManifest,
    expected: &BakeManifest,
) -> Option<&'static str> {
    if found.format_version != expected.format_version {
        return Some("manifest format_version mismatch");
    }
    if found.tool_version != expected.tool_version {
        return Some("manifest tool_version mismatch");
    }
    if found.input_hash_sha256_hex != expected.input_hash_sha256_hex {
        return Some("manifest input_hash mismatch");
    }
    None
}
