//! Persistence for the last-selected location.
//!
//! One JSON document holding `{lokasi, id}`, read at startup and
//! written on every location change. A missing or unreadable file is
//! not an error — the caller falls back to the configured default.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NotifyError, Result};
use crate::types::LocationSelection;

/// Default path of the persisted selection,
/// `~/.config/imsakiyah/location.json`.
///
/// Returns `None` when no home directory can be determined.
pub fn default_selection_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("imsakiyah")
            .join("location.json"),
    )
}

/// Load the persisted selection, if any.
///
/// Read failures and malformed documents are logged and treated as
/// "nothing persisted" rather than surfaced; a corrupt file must not
/// block startup.
pub fn load_selection(path: &Path) -> Option<LocationSelection> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot read saved location: {e}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(selection) => Some(selection),
        Err(e) => {
            tracing::warn!(path = %path.display(), "saved location is malformed: {e}");
            None
        }
    }
}

/// Persist the selection, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`NotifyError::Config`] when the document cannot be written.
pub fn save_selection(path: &Path, selection: &LocationSelection) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| NotifyError::Config(format!("cannot create {}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(selection)
        .map_err(|e| NotifyError::Config(format!("cannot encode location: {e}")))?;
    fs::write(path, json)
        .map_err(|e| NotifyError::Config(format!("cannot write {}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), %selection, "location selection saved");
    Ok(())
}
