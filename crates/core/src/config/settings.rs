use crate::{
    error::{Error, Result},
    interceptor::TerminalPlatform,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = ".lando-dock.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Lando executable, either a bare name looked up on PATH or a path
    pub binary: String,
    /// How deep below each workspace folder definition files are searched for
    pub scan_depth: usize,
    /// Directory names never descended into while scanning
    pub exclude_dirs: Vec<String>,
    pub debounce_ms: u64,
    /// Select the first discovered app when nothing is selected
    pub auto_activate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    pub intercept: InterceptSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterceptSettings {
    pub enabled: bool,
    /// Working directory inside the container for intercepted commands
    pub exec_cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shim_dir: Option<PathBuf>,
    pub platforms: Vec<TerminalPlatform>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binary: "lando".to_string(),
            scan_depth: 4,
            exclude_dirs: vec![
                "node_modules".to_string(),
                "vendor".to_string(),
                ".git".to_string(),
            ],
            debounce_ms: 250,
            auto_activate: true,
            command_timeout_secs: None,
            intercept: InterceptSettings::default(),
        }
    }
}

impl Default for InterceptSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            exec_cwd: "/app".to_string(),
            shim_dir: None,
            platforms: TerminalPlatform::ALL.to_vec(),
        }
    }
}

impl Settings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse {}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize settings: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Settings for a workspace: the nearest settings file at or above
    /// `workspace_root`, or the defaults when there is none.
    pub fn load_for_workspace(workspace_root: &Path) -> Result<Self> {
        match Self::find_config_file(workspace_root) {
            Some(path) => {
                debug!("Loading settings from {:?}", path);
                Self::load_from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            let config_path = current.join(SETTINGS_FILE_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }

            current = current.parent()?;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.binary.trim().is_empty() {
            return Err(Error::ConfigError("binary must not be empty".to_string()));
        }
        if self.scan_depth == 0 {
            return Err(Error::ConfigError(
                "scanDepth must be at least 1".to_string(),
            ));
        }
        if !self.intercept.exec_cwd.starts_with('/') {
            return Err(Error::ConfigError(format!(
                "intercept.execCwd must be an absolute container path, got '{}'",
                self.intercept.exec_cwd
            )));
        }
        Ok(())
    }

    /// Absolute path of the lando binary when it can be found on PATH.
    pub fn resolve_binary(&self) -> PathBuf {
        match which::which(&self.binary) {
            Ok(path) => path,
            Err(e) => {
                debug!("{} not found on PATH ({e}), using it verbatim", self.binary);
                PathBuf::from(&self.binary)
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{ "binary": "/opt/lando/bin/lando", "intercept": { "enabled": true } }"#,
        )
        .unwrap();

        assert_eq!(settings.binary, "/opt/lando/bin/lando");
        assert_eq!(settings.scan_depth, 4);
        assert!(settings.intercept.enabled);
        assert_eq!(settings.intercept.exec_cwd, "/app");
        assert_eq!(settings.intercept.platforms.len(), 3);
    }

    #[test]
    fn test_found_in_parent_directory() -> Result<()> {
        let temp = TempDir::new()?;
        let nested = temp.path().join("apps").join("site");
        std::fs::create_dir_all(&nested)?;
        std::fs::write(
            temp.path().join(SETTINGS_FILE_NAME),
            r#"{ "scanDepth": 2, "autoActivate": false }"#,
        )?;

        let settings = Settings::load_for_workspace(&nested)?;
        assert_eq!(settings.scan_depth, 2);
        assert!(!settings.auto_activate);
        Ok(())
    }

    #[test]
    fn test_relative_exec_cwd_rejected() {
        let mut settings = Settings::default();
        settings.intercept.exec_cwd = "app".to_string();
        assert!(matches!(settings.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_malformed_file_is_config_error() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "{ not json")?;
        assert!(matches!(
            Settings::load_from_file(&path),
            Err(Error::ConfigError(_))
        ));
        Ok(())
    }
}
