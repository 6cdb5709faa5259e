//! Remote state snapshot persistence.
//!
//! Persists a [`RemoteState`] JSON document, by default at
//! `<home>/.lpbuild/remote-state.json`. Writes go to `<path>.tmp` and are
//! renamed into place.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{io_err, SyncError};
use crate::memory::RemoteState;

/// `~/.lpbuild/remote-state.json`, rooted at `home`.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".lpbuild").join("remote-state.json")
}

/// Load the state at `path`.
///
/// Returns an empty state if the file does not yet exist.
pub fn load_at(path: &Path) -> Result<RemoteState, SyncError> {
    if !path.exists() {
        tracing::debug!("{} does not exist, starting from empty state", path.display());
        return Ok(RemoteState::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Stamp `updated_at` and save `state` atomically.
pub fn save_at(path: &Path, state: &mut RemoteState) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state file path")));
    };
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    state.updated_at = Some(Utc::now());
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    tracing::debug!("saved remote state to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_state_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let state = load_at(&default_path_at(tmp.path())).unwrap();
        assert_eq!(state, RemoteState::default());
    }

    #[test]
    fn save_then_load_keeps_state_and_stamps_time() {
        let tmp = TempDir::new().unwrap();
        let path = default_path_at(tmp.path());
        let mut state = RemoteState::default()
            .with_team("openstack-charmers")
            .with_project("charm-keystone", "openstack-charmers")
            .with_repository(
                "openstack-charmers",
                "charm-keystone",
                "https://opendev.org/openstack/charm-keystone",
                &["master"],
            );

        save_at(&path, &mut state).unwrap();
        assert!(state.updated_at.is_some());
        let loaded = load_at(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        let path = default_path_at(tmp.path());
        save_at(&path, &mut RemoteState::default()).unwrap();
        assert!(path.exists());
        assert!(
            !path.with_extension("json.tmp").exists(),
            "tmp file should be removed after atomic rename"
        );
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_at(&path), Err(SyncError::Json(_))));
    }
}
