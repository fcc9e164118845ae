use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::AppStatus;

/// A service declared by an app (or contributed by its recipe)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ServiceDescriptor {
    pub fn new(service_type: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            service_type: service_type.into(),
            version: version.map(str::to_string),
        }
    }

    /// Split a lando type string such as `php:8.3` or `mariadb:10.6`.
    pub fn from_type_string(raw: &str) -> Self {
        match raw.trim().split_once(':') {
            Some((kind, version)) if !version.is_empty() => Self::new(kind, Some(version)),
            Some((kind, _)) => Self::new(kind, None),
            None => Self::new(raw.trim(), None),
        }
    }
}

/// The command a tooling entry runs; either one line or several steps run in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolingCommand {
    Single(String),
    Steps(Vec<String>),
}

impl ToolingCommand {
    pub fn steps(&self) -> Vec<&str> {
        match self {
            ToolingCommand::Single(cmd) => vec![cmd.as_str()],
            ToolingCommand::Steps(steps) => steps.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for ToolingCommand {
    fn from(value: &str) -> Self {
        ToolingCommand::Single(value.to_string())
    }
}

/// A named helper command, usually run inside one of the app's services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolingEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    pub command: ToolingCommand,
}

impl ToolingEntry {
    pub fn new(name: impl Into<String>, command: impl Into<ToolingCommand>) -> Self {
        Self {
            name: name.into(),
            service: None,
            description: None,
            working_dir: None,
            command: command.into(),
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// One discovered development environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
    pub services: IndexMap<String, ServiceDescriptor>,
    pub tooling: Vec<ToolingEntry>,
    pub definition_path: PathBuf,
    pub status: AppStatus,
}

impl AppDescriptor {
    pub fn new(name: impl Into<String>, definition_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            recipe: None,
            services: IndexMap::new(),
            tooling: Vec::new(),
            definition_path: definition_path.into(),
            status: AppStatus::Stopped,
        }
    }

    /// Directory holding the definition file; lando commands run from here.
    pub fn root(&self) -> &Path {
        self.definition_path.parent().unwrap_or(Path::new("."))
    }

    pub fn tool(&self, name: &str) -> Option<&ToolingEntry> {
        self.tooling.iter().find(|entry| entry.name == name)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, AppStatus::Running | AppStatus::Restarting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_string_is_split() {
        assert_eq!(
            ServiceDescriptor::from_type_string("php:8.3"),
            ServiceDescriptor::new("php", Some("8.3"))
        );
        assert_eq!(
            ServiceDescriptor::from_type_string("nginx"),
            ServiceDescriptor::new("nginx", None)
        );
        assert_eq!(
            ServiceDescriptor::from_type_string("node:"),
            ServiceDescriptor::new("node", None)
        );
    }

    #[test]
    fn test_tooling_command_accepts_string_or_steps() {
        let single: ToolingCommand = serde_json::from_str(r#""composer install""#).unwrap();
        assert_eq!(single.steps(), vec!["composer install"]);

        let steps: ToolingCommand = serde_json::from_str(r#"["npm ci", "npm run build"]"#).unwrap();
        assert_eq!(steps.steps(), vec!["npm ci", "npm run build"]);
    }

    #[test]
    fn test_root_is_definition_directory() {
        let app = AppDescriptor::new("site", "/work/site/.lando.yml");
        assert_eq!(app.root(), Path::new("/work/site"));
    }
}
