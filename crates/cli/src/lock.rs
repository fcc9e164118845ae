//! Cross-process guard for lifecycle operations
//!
//! Each CLI call is its own process, so the in-memory busy status cannot stop
//! a second `lando-dock start` racing the first. While an operation runs, a
//! lock file named after the app's directory exists; it is removed when the
//! guard is dropped.

use anyhow::{Context, Result, bail};
use lando_dock_core::{AppDescriptor, LifecycleOperation};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct OperationLock {
    path: PathBuf,
}

impl OperationLock {
    pub fn lock_dir(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".vscode").join("lando-dock").join("locks")
    }

    /// Lock file for the app whose definition lives in `app_root`
    pub fn path_for(workspace_root: &Path, app_root: &Path) -> PathBuf {
        let relative = app_root.strip_prefix(workspace_root).unwrap_or(app_root);
        let key: String = relative
            .to_string_lossy()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        let key = if key.is_empty() { "_".to_string() } else { key };
        Self::lock_dir(workspace_root).join(format!("{key}.lock"))
    }

    pub fn acquire(
        workspace_root: &Path,
        app: &AppDescriptor,
        operation: LifecycleOperation,
    ) -> Result<Self> {
        let path = Self::path_for(workspace_root, app.root());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                bail!(
                    "App '{}' is busy ({}). Remove {} if no other lando-dock is running.",
                    app.name,
                    holder.trim(),
                    path.display()
                );
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()));
            }
        };
        writeln!(file, "{} by process {}", operation, std::process::id())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Acquired {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("Could not remove {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn app(root: &Path) -> AppDescriptor {
        AppDescriptor::new("site", root.join("sites/site/.lando.yml"))
    }

    #[test]
    fn second_operation_on_the_same_app_is_refused() {
        let temp = TempDir::new().unwrap();
        let site = app(temp.path());

        let held = OperationLock::acquire(temp.path(), &site, LifecycleOperation::Start).unwrap();
        assert!(held.path().ends_with("sites_site.lock"));

        let err = OperationLock::acquire(temp.path(), &site, LifecycleOperation::Rebuild)
            .unwrap_err()
            .to_string();
        assert!(err.contains("App 'site' is busy"), "{err}");
        assert!(err.contains("start by process"), "{err}");

        drop(held);
        assert!(OperationLock::acquire(temp.path(), &site, LifecycleOperation::Rebuild).is_ok());
    }

    #[test]
    fn other_apps_are_not_blocked() {
        let temp = TempDir::new().unwrap();
        let one = AppDescriptor::new("one", temp.path().join("one/.lando.yml"));
        let two = AppDescriptor::new("two", temp.path().join("two/.lando.yml"));

        let _one = OperationLock::acquire(temp.path(), &one, LifecycleOperation::Start).unwrap();
        assert!(OperationLock::acquire(temp.path(), &two, LifecycleOperation::Stop).is_ok());
    }

    #[test]
    fn app_at_the_workspace_root_gets_a_name() {
        let root = Path::new("/work");
        assert_eq!(
            OperationLock::path_for(root, root),
            PathBuf::from("/work/.vscode/lando-dock/locks/_.lock")
        );
    }
}
