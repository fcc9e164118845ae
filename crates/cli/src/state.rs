//! Session state carried between invocations
//!
//! Each CLI call is a fresh process, so the selection, the last observed
//! statuses and the interceptor's restore points are kept in a small JSON file
//! next to the workspace settings.

use anyhow::{Context, Result};
use lando_dock_core::{AppStatus, RestorePoints, Session};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const STATE_FILE: &str = "lando-dock.state.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_app: Option<String>,
    #[serde(default)]
    pub statuses: BTreeMap<PathBuf, AppStatus>,
    #[serde(default, skip_serializing_if = "RestorePoints::is_empty")]
    pub interception: RestorePoints,
}

impl SessionState {
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(".vscode").join(STATE_FILE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Saved session state to {}", path.display());
        Ok(())
    }

    pub fn capture<R, E>(session: &Session<R, E>) -> Self
    where
        R: lando_dock_core::CliRunner,
        E: lando_dock_core::TerminalEnvStore,
    {
        Self {
            active_app: session.active().map(|app| app.name.clone()),
            statuses: session.registry().statuses(),
            interception: session.restore_points().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_state_is_default() {
        let temp = TempDir::new().unwrap();
        let state = SessionState::load(&SessionState::path_for(temp.path())).unwrap();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_state_round_trips_through_disk() {
        let temp = TempDir::new().unwrap();
        let path = SessionState::path_for(temp.path());
        let mut state = SessionState {
            active_app: Some("site".to_string()),
            ..Default::default()
        };
        state
            .statuses
            .insert(temp.path().join("site/.lando.yml"), AppStatus::Running);

        state.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"running\""));
        assert!(!text.contains("interception"));
        assert_eq!(SessionState::load(&path).unwrap(), state);
    }
}
