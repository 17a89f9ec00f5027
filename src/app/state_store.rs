// EveTranslator - app/state_store.rs
//
// Remembers the selected character and group between runs.
//
// The file is written atomically (temp file, then rename) so a crash during
// save leaves the previous selection intact. Any load failure means "no
// remembered selection"; the manager then falls back to config and
// auto-selection.

use crate::util::constants::{SELECTION_FILE_NAME, SELECTION_FILE_VERSION};
use crate::util::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted selection snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    /// Must equal `SELECTION_FILE_VERSION` to be accepted.
    pub version: u32,

    #[serde(default)]
    pub character_id: Option<String>,

    /// Group ids are transcript paths, so a remembered group is only useful
    /// while that transcript is still active.
    #[serde(default)]
    pub fleet_id: Option<String>,
}

impl SelectionState {
    pub fn new(character_id: Option<String>, fleet_id: Option<String>) -> Self {
        Self {
            version: SELECTION_FILE_VERSION,
            character_id,
            fleet_id,
        }
    }
}

pub fn selection_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SELECTION_FILE_NAME)
}

/// Save `state` to `path` atomically, creating parent directories as needed.
pub fn save(state: &SelectionState, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(state).map_err(|e| ConfigError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes()).map_err(|e| ConfigError::Io {
        path: tmp.clone(),
        source: e,
    })?;

    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    tracing::debug!(path = %path.display(), "Selection saved");
    Ok(())
}

/// Load a remembered selection. `None` on a missing, malformed or
/// version-mismatched file.
pub fn load(path: &Path) -> Option<SelectionState> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read selection file");
            }
        })
        .ok()?;

    let state: SelectionState = serde_json::from_str(&content)
        .map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Selection file is malformed; ignoring");
        })
        .ok()?;

    if state.version != SELECTION_FILE_VERSION {
        tracing::warn!(
            found = state.version,
            expected = SELECTION_FILE_VERSION,
            "Selection file version mismatch; ignoring"
        );
        return None;
    }

    tracing::debug!(
        path = %path.display(),
        character = ?state.character_id,
        fleet = ?state.fleet_id,
        "Selection restored"
    );
    Some(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = selection_path(&dir.path().join("nested"));
        let state = SelectionState::new(Some("9001".to_string()), None);

        save(&state, &path).expect("save should succeed");
        assert!(!path.with_extension("json.tmp").exists(), "temp file must be renamed away");
        assert_eq!(load(&path), Some(state));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load(&selection_path(dir.path())).is_none());
    }

    /// Corrupt content and foreign versions are ignored, not errors.
    #[test]
    fn test_bad_content_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = selection_path(dir.path());

        std::fs::write(&path, "{ not json").expect("write");
        assert!(load(&path).is_none());

        std::fs::write(&path, r#"{"version": 99, "character_id": "1"}"#).expect("write");
        assert!(load(&path).is_none(), "version mismatch must be rejected");
    }
}
