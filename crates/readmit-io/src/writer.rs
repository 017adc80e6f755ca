//! JSON report writer.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use crate::IoError;

/// Write `value` as pretty-printed JSON to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`IoError::Encode`] if the value cannot be represented as JSON
/// and [`IoError::WriteFile`] if the file or its directory cannot be written.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| IoError::Encode {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::WriteFile {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(path, json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("report written");
    Ok(())
}
