//! Access to the host's terminal environment settings

use super::TerminalPlatform;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Environment variable name to value; `None` is an explicit unset
pub type EnvMap = BTreeMap<String, Option<String>>;

/// Reads and writes whole platform buckets. `None` means the setting is
/// absent, which is distinct from an empty mapping.
pub trait TerminalEnvStore {
    fn read(&self, platform: TerminalPlatform) -> Result<Option<EnvMap>>;
    fn write(&mut self, platform: TerminalPlatform, value: Option<&EnvMap>) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryBuckets {
    buckets: BTreeMap<TerminalPlatform, EnvMap>,
    failing: HashSet<TerminalPlatform>,
    writes: usize,
}

/// In-memory buckets with write-failure injection; clones share state
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvStore {
    inner: Rc<RefCell<MemoryBuckets>>,
}

impl MemoryEnvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, platform: TerminalPlatform, value: EnvMap) -> Self {
        self.inner.borrow_mut().buckets.insert(platform, value);
        self
    }

    pub fn bucket(&self, platform: TerminalPlatform) -> Option<EnvMap> {
        self.inner.borrow().buckets.get(&platform).cloned()
    }

    /// Make every later write to `platform` fail
    pub fn fail_writes_to(&self, platform: TerminalPlatform) {
        self.inner.borrow_mut().failing.insert(platform);
    }

    pub fn heal(&self) {
        self.inner.borrow_mut().failing.clear();
    }

    /// Successful writes so far
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }
}

impl TerminalEnvStore for MemoryEnvStore {
    fn read(&self, platform: TerminalPlatform) -> Result<Option<EnvMap>> {
        Ok(self.bucket(platform))
    }

    fn write(&mut self, platform: TerminalPlatform, value: Option<&EnvMap>) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.failing.contains(&platform) {
            return Err(Error::ConfigurationWriteFailed(format!(
                "{} is read-only",
                platform.setting_key()
            )));
        }
        match value {
            Some(map) => inner.buckets.insert(platform, map.clone()),
            None => inner.buckets.remove(&platform),
        };
        inner.writes += 1;
        Ok(())
    }
}

/// The `terminal.integrated.env.*` keys of a workspace `settings.json`.
///
/// Every other key in the file is preserved. The file must be plain JSON;
/// a file that does not parse is never rewritten.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `.vscode/settings.json` under the workspace root
    pub fn for_workspace(root: &Path) -> Self {
        Self::new(root.join(".vscode").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<Map<String, Value>>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Some(Map::new()));
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(Error::ConfigError(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(Error::ConfigError(format!(
                "cannot parse {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl TerminalEnvStore for JsonSettingsStore {
    fn read(&self, platform: TerminalPlatform) -> Result<Option<EnvMap>> {
        let Some(settings) = self.load()? else {
            return Ok(None);
        };
        match settings.get(&platform.setting_key()) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                Error::ConfigError(format!("{}: {}", platform.setting_key(), e))
            }),
        }
    }

    fn write(&mut self, platform: TerminalPlatform, value: Option<&EnvMap>) -> Result<()> {
        let write_failed =
            |e: &dyn std::fmt::Display| Error::ConfigurationWriteFailed(format!("{}: {}", self.path.display(), e));

        let mut settings = self.load().map_err(|e| write_failed(&e))?.unwrap_or_default();
        let key = platform.setting_key();
        match value {
            Some(map) => {
                let encoded = serde_json::to_value(map).map_err(|e| write_failed(&e))?;
                settings.insert(key, encoded);
            }
            None => {
                settings.remove(&key);
            }
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| write_failed(&e))?;
        }
        let mut text =
            serde_json::to_string_pretty(&Value::Object(settings)).map_err(|e| write_failed(&e))?;
        text.push('\n');
        fs::write(&self.path, text).map_err(|e| write_failed(&e))?;
        debug!("Wrote {} to {:?}", platform.setting_key(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, Option<&str>)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_missing_file_reads_as_absent() {
        let temp = TempDir::new().unwrap();
        let store = JsonSettingsStore::for_workspace(temp.path());
        assert_eq!(store.read(TerminalPlatform::Linux).unwrap(), None);
    }

    #[test]
    fn test_write_preserves_unrelated_settings() -> Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join(".vscode");
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join("settings.json"),
            r#"{"editor.tabSize": 2, "terminal.integrated.env.linux": {"FOO": "bar", "GONE": null}}"#,
        )?;

        let mut store = JsonSettingsStore::for_workspace(temp.path());
        assert_eq!(
            store.read(TerminalPlatform::Linux)?,
            Some(env(&[("FOO", Some("bar")), ("GONE", None)]))
        );

        store.write(TerminalPlatform::Osx, Some(&env(&[("A", Some("1"))])))?;
        store.write(TerminalPlatform::Linux, None)?;

        let written: Value = serde_json::from_str(&fs::read_to_string(store.path())?)?;
        assert_eq!(written["editor.tabSize"], 2);
        assert_eq!(written["terminal.integrated.env.osx"]["A"], "1");
        assert!(written.get("terminal.integrated.env.linux").is_none());
        Ok(())
    }

    #[test]
    fn test_unparseable_file_is_never_rewritten() -> Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join(".vscode");
        fs::create_dir_all(&dir)?;
        let original = "{\n  // comments are not JSON\n  \"a\": 1\n}\n";
        fs::write(dir.join("settings.json"), original)?;

        let mut store = JsonSettingsStore::for_workspace(temp.path());
        assert!(matches!(
            store.read(TerminalPlatform::Linux),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            store.write(TerminalPlatform::Linux, Some(&EnvMap::new())),
            Err(Error::ConfigurationWriteFailed(_))
        ));
        assert_eq!(fs::read_to_string(dir.join("settings.json"))?, original);
        Ok(())
    }

    #[test]
    fn test_memory_store_failure_injection() {
        let mut store = MemoryEnvStore::new();
        store.fail_writes_to(TerminalPlatform::Windows);
        assert!(store.write(TerminalPlatform::Linux, Some(&EnvMap::new())).is_ok());
        assert!(store.write(TerminalPlatform::Windows, Some(&EnvMap::new())).is_err());
        assert_eq!(store.writes(), 1);
    }
}
