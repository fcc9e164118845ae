use anyhow::{Context, Result};
use lando_dock_core::{JsonSettingsStore, Session, Settings, SystemRunner};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::state::SessionState;

pub type LiveSession = Session<SystemRunner, JsonSettingsStore>;

/// The workspace folder a command operates on
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub settings: Settings,
    state_path: PathBuf,
}

impl Workspace {
    /// Resolve the workspace root (the current directory unless given) and
    /// load its settings.
    pub fn locate(root: Option<&Path>) -> Result<Self> {
        let root = match root {
            Some(path) => path.to_path_buf(),
            None => env::current_dir().context("Failed to get current directory")?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("Workspace {} does not exist", root.display()))?;
        let settings = Settings::load_for_workspace(&root)
            .with_context(|| format!("Failed to load settings for {}", root.display()))?;
        debug!("Workspace {} with settings {:?}", root.display(), settings);

        Ok(Self {
            state_path: SessionState::path_for(&root),
            root,
            settings,
        })
    }

    /// Scan the workspace and pick up where the last invocation left off.
    pub fn open_session(&self) -> Result<LiveSession> {
        let state = SessionState::load(&self.state_path)?;
        let mut session = Session::for_workspace(&self.root, self.settings.clone())
            .with_restore_points(state.interception.clone());

        let report = session.scan_preferring(state.active_app.as_deref());
        for (dir, reason) in &report.failed {
            warn!("Skipped app in {}: {}", dir.display(), reason);
        }
        session.registry_mut().restore_statuses(&state.statuses);
        Ok(session)
    }

    pub fn save(&self, session: &LiveSession) -> Result<()> {
        SessionState::capture(session).save(&self.state_path)
    }
}
