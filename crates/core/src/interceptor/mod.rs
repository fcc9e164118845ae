//! Terminal environment interception
//!
//! Patches the host's per-platform terminal environment so that `php` typed
//! in an integrated terminal resolves to a shim that forwards into the active
//! app's container. The value each bucket had before the first patch is kept
//! as its restore point until interception is disabled.

mod platform;
mod store;

pub use platform::TerminalPlatform;
pub use store::{EnvMap, JsonSettingsStore, MemoryEnvStore, TerminalEnvStore};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the app whose container receives intercepted commands
pub const CONTAINER_VAR: &str = "LANDO_DOCK_CONTAINER";
/// Working directory inside the container
pub const EXEC_CWD_VAR: &str = "LANDO_DOCK_EXEC_CWD";
/// Host directory of the target app, where the shim runs `lando exec`
pub const APP_ROOT_VAR: &str = "LANDO_DOCK_APP_ROOT";
pub const PATH_VAR: &str = "PATH";
/// PATH expression used when a bucket has no PATH of its own
pub const INHERITED_PATH: &str = "${env:PATH}";

/// Pre-patch bucket values, persisted between sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePoints {
    /// App the buckets are currently patched for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_root: Option<PathBuf>,
    #[serde(default)]
    pub buckets: BTreeMap<TerminalPlatform, Option<EnvMap>>,
}

impl RestorePoints {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

pub struct TerminalEnvInterceptor<S> {
    store: S,
    platforms: Vec<TerminalPlatform>,
    shim_dir: PathBuf,
    restore: RestorePoints,
}

impl<S: TerminalEnvStore> TerminalEnvInterceptor<S> {
    pub fn new(store: S, shim_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            platforms: TerminalPlatform::ALL.to_vec(),
            shim_dir: shim_dir.into(),
            restore: RestorePoints::default(),
        }
    }

    pub fn with_platforms(mut self, platforms: Vec<TerminalPlatform>) -> Self {
        self.platforms = platforms;
        self
    }

    /// Resume from restore points saved by an earlier session
    pub fn with_restore_points(mut self, restore: RestorePoints) -> Self {
        self.restore = restore;
        self
    }

    pub fn restore_points(&self) -> &RestorePoints {
        &self.restore
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn shim_dir(&self) -> &Path {
        &self.shim_dir
    }

    pub fn is_enabled(&self) -> bool {
        !self.restore.is_empty()
    }

    /// App the terminals are currently redirected to
    pub fn target(&self) -> Option<&str> {
        self.restore.app.as_deref()
    }

    /// Root directory of the app the terminals are redirected to
    pub fn target_root(&self) -> Option<&Path> {
        self.restore.app_root.as_deref()
    }

    /// Patch every bucket for `app`, whose definition lives in `app_root`.
    ///
    /// All buckets are read before any is written. If a write fails, the
    /// buckets already written are put back and no restore point is kept
    /// from this call. Calling again while enabled re-targets the patch and
    /// leaves the restore points alone.
    pub fn enable(&mut self, app: &str, app_root: &Path, exec_cwd: &str) -> Result<()> {
        let mut current = Vec::with_capacity(self.platforms.len());
        for platform in &self.platforms {
            current.push((*platform, self.store.read(*platform)?));
        }

        let patched: Vec<(TerminalPlatform, EnvMap)> = current
            .iter()
            .map(|(platform, value)| {
                (*platform, self.patch(*platform, value.as_ref(), app, app_root, exec_cwd))
            })
            .collect();

        for (index, (platform, value)) in patched.iter().enumerate() {
            if let Err(e) = self.store.write(*platform, Some(value)) {
                warn!("Writing {} failed: {}; rolling back", platform.setting_key(), e);
                self.roll_back(&current[..index]);
                return Err(Error::ConfigurationWriteFailed(format!(
                    "{}: {}",
                    platform.setting_key(),
                    e
                )));
            }
        }

        for (platform, value) in current {
            // only the first enable records what the bucket held
            self.restore.buckets.entry(platform).or_insert(value);
        }
        self.restore.app = Some(app.to_string());
        self.restore.app_root = Some(app_root.to_path_buf());
        info!("Terminal interception enabled for '{}'", app);
        Ok(())
    }

    /// Put every patched bucket back exactly as it was. Returns whether
    /// anything was restored; disabling when not enabled is a no-op.
    pub fn disable(&mut self) -> Result<bool> {
        if self.restore.is_empty() {
            debug!("Terminal interception is not enabled");
            return Ok(false);
        }

        let mut before = Vec::with_capacity(self.restore.buckets.len());
        for platform in self.restore.buckets.keys() {
            before.push((*platform, self.store.read(*platform)?));
        }

        let targets: Vec<(TerminalPlatform, Option<EnvMap>)> = self
            .restore
            .buckets
            .iter()
            .map(|(platform, value)| (*platform, value.clone()))
            .collect();
        for (index, (platform, original)) in targets.iter().enumerate() {
            if let Err(e) = self.store.write(*platform, original.as_ref()) {
                warn!("Restoring {} failed: {}; rolling back", platform.setting_key(), e);
                self.roll_back(&before[..index]);
                return Err(Error::ConfigurationWriteFailed(format!(
                    "{}: {}",
                    platform.setting_key(),
                    e
                )));
            }
        }

        info!(
            "Terminal interception disabled for '{}'",
            self.restore.app.as_deref().unwrap_or("<unknown>")
        );
        self.restore = RestorePoints::default();
        Ok(true)
    }

    fn roll_back(&mut self, written: &[(TerminalPlatform, Option<EnvMap>)]) {
        for (platform, value) in written.iter().rev() {
            if let Err(e) = self.store.write(*platform, value.as_ref()) {
                warn!("Could not roll back {}: {}", platform.setting_key(), e);
            }
        }
    }

    fn patch(
        &self,
        platform: TerminalPlatform,
        current: Option<&EnvMap>,
        app: &str,
        app_root: &Path,
        exec_cwd: &str,
    ) -> EnvMap {
        let mut env = current.cloned().unwrap_or_default();
        env.insert(CONTAINER_VAR.to_string(), Some(app.to_string()));
        env.insert(APP_ROOT_VAR.to_string(), Some(app_root.display().to_string()));
        env.insert(EXEC_CWD_VAR.to_string(), Some(exec_cwd.to_string()));

        let prefix = format!("{}{}", self.shim_dir.display(), platform.path_separator());
        let prior = match env.get(PATH_VAR) {
            Some(Some(path)) => path.strip_prefix(&prefix).unwrap_or(path).to_string(),
            _ => INHERITED_PATH.to_string(),
        };
        env.insert(PATH_VAR.to_string(), Some(format!("{prefix}{prior}")));
        env
    }
}
