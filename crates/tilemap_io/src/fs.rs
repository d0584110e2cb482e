//! File helpers: whole-file reads and atomic replacement writes

use std::io::Write;
use std::path::Path;
use tilemap_core::GenericError;

pub fn read_to_string(path: &Path) -> Result<String, GenericError> {
    std::fs::read_to_string(path).map_err(|e| {
        tracing::warn!("Could not read {:?}: {}", path, e);
        GenericError::from(e)
    })
}

/// Replace `path` with `contents`
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the destination, so a failed write leaves the old file intact.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), GenericError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| {
        tracing::warn!("Could not replace {:?}: {}", path, e.error);
        GenericError::from(e.error)
    })?;
    Ok(())
}
