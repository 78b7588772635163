use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes through a sibling `.tmp` file so readers never see a half-written output.
pub(crate) fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    fs::write(&staging, bytes)?;
    swap_into_place(&staging, path)
}

pub(crate) fn write_json_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), AtomicJsonError> {
    let text = serde_json::to_string_pretty(value).map_err(AtomicJsonError::Encode)?;
    write_bytes_atomic(path, text.as_bytes()).map_err(AtomicJsonError::Io)
}

#[derive(Debug, thiserror::Error)]
pub enum AtomicJsonError {
    #[error("encode json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Io(io::Error),
}

fn swap_into_place(staging: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(staging);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(staging, final_path) {
        let _ = fs::remove_file(staging);
        return Err(error);
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("bake_output");
    let staging_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(staging_name),
        None => PathBuf::from(staging_name),
    }
}
