//! Definition file parsing
//!
//! Only the keys that identify an app are read (`name`, `recipe`, `services`,
//! `tooling`); everything else in the file is ignored.

use crate::{
    error::{Error, Result},
    types::{AppDescriptor, ServiceDescriptor, ToolingCommand, ToolingEntry},
};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::warn;

/// Type given to services that declare none and have no recipe counterpart
pub const DEFAULT_SERVICE_TYPE: &str = "lando";

/// Everything read from a definition document, before recipe defaults apply
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub descriptor: AppDescriptor,
    /// Services that were declared without a `type`
    pub untyped_services: Vec<String>,
    /// Tooling names set to `false`/`disabled`, removing a recipe default
    pub disabled_tooling: Vec<String>,
}

/// Parse one definition file into a descriptor holding only what the file
/// itself declares.
pub fn parse(text: &str, path: &Path) -> Result<AppDescriptor> {
    let document = parse_document(text, path)?;
    Ok(parse_definition(&document, path)?.descriptor)
}

/// Check the text is well-formed YAML with a mapping (or nothing) at the top.
pub fn parse_document(text: &str, path: &Path) -> Result<Value> {
    let document: Value =
        serde_yaml::from_str(text).map_err(|e| Error::parse(path, e.to_string()))?;
    match document {
        Value::Null | Value::Mapping(_) => Ok(document),
        other => Err(Error::parse(
            path,
            format!("expected a mapping at the top level, found {}", kind_of(&other)),
        )),
    }
}

/// Extract app identity, services and tooling from a (possibly merged) document.
pub fn parse_definition(document: &Value, definition_path: &Path) -> Result<Definition> {
    let empty = Mapping::new();
    let root = match document {
        Value::Null => &empty,
        Value::Mapping(map) => map,
        other => {
            return Err(Error::parse(
                definition_path,
                format!("expected a mapping at the top level, found {}", kind_of(other)),
            ));
        }
    };

    let name = root
        .get("name")
        .and_then(scalar_to_string)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| directory_name(definition_path));

    let recipe = match root.get("recipe") {
        None | Some(Value::Null) => None,
        Some(value) => match scalar_to_string(value) {
            Some(recipe) if !recipe.trim().is_empty() => Some(recipe),
            _ => {
                warn!("{:?}: ignoring non-scalar recipe", definition_path);
                None
            }
        },
    };

    let mut descriptor = AppDescriptor::new(name, definition_path);
    descriptor.recipe = recipe;

    let (services, untyped_services) = parse_services(root.get("services"), definition_path);
    descriptor.services = services;

    let (tooling, disabled_tooling) = parse_tooling(root.get("tooling"), definition_path);
    descriptor.tooling = tooling;

    Ok(Definition {
        descriptor,
        untyped_services,
        disabled_tooling,
    })
}

fn parse_services(
    value: Option<&Value>,
    path: &Path,
) -> (IndexMap<String, ServiceDescriptor>, Vec<String>) {
    let mut services = IndexMap::new();
    let mut untyped = Vec::new();

    let Some(map) = mapping_or_warn(value, "services", path) else {
        return (services, untyped);
    };

    for (key, body) in map {
        let Some(service_name) = scalar_to_string(key) else {
            warn!("{:?}: skipping service with a non-scalar name", path);
            continue;
        };
        let declared_type = body
            .as_mapping()
            .and_then(|m| m.get("type"))
            .and_then(scalar_to_string);
        match declared_type {
            Some(raw) => {
                services.insert(service_name, ServiceDescriptor::from_type_string(&raw));
            }
            None => {
                services.insert(
                    service_name.clone(),
                    ServiceDescriptor::new(DEFAULT_SERVICE_TYPE, None),
                );
                untyped.push(service_name);
            }
        }
    }

    (services, untyped)
}

fn parse_tooling(value: Option<&Value>, path: &Path) -> (Vec<ToolingEntry>, Vec<String>) {
    let mut tooling = Vec::new();
    let mut disabled = Vec::new();

    let Some(map) = mapping_or_warn(value, "tooling", path) else {
        return (tooling, disabled);
    };

    for (key, body) in map {
        let Some(tool_name) = scalar_to_string(key) else {
            warn!("{:?}: skipping tooling entry with a non-scalar name", path);
            continue;
        };

        match body {
            Value::Bool(false) => disabled.push(tool_name),
            Value::String(s) if s.trim() == "disabled" => disabled.push(tool_name),
            Value::String(s) => tooling.push(ToolingEntry::new(tool_name, s.as_str())),
            Value::Null => {
                let command = ToolingCommand::Single(tool_name.clone());
                tooling.push(ToolingEntry::new(tool_name, command));
            }
            Value::Sequence(_) => match command_from_value(body) {
                Some(command) => tooling.push(ToolingEntry::new(tool_name, command)),
                None => warn!("{:?}: tooling '{}' has an unreadable command", path, tool_name),
            },
            Value::Mapping(fields) => tooling.push(tooling_from_mapping(tool_name, fields, path)),
            other => warn!(
                "{:?}: skipping tooling '{}' declared as {}",
                path,
                tool_name,
                kind_of(other)
            ),
        }
    }

    (tooling, disabled)
}

fn tooling_from_mapping(name: String, fields: &Mapping, path: &Path) -> ToolingEntry {
    let field = |keys: &[&str]| keys.iter().find_map(|key| fields.get(*key));

    let command = match field(&["cmd", "command"]) {
        Some(value) => command_from_value(value).unwrap_or_else(|| {
            warn!("{:?}: tooling '{}' has an unreadable command, using its name", path, name);
            ToolingCommand::Single(name.clone())
        }),
        // lando runs the tool's own name inside the service when no cmd is given
        None => ToolingCommand::Single(name.clone()),
    };

    let mut entry = ToolingEntry::new(name, command);
    entry.service = field(&["service"]).and_then(scalar_to_string);
    entry.description = field(&["description"]).and_then(scalar_to_string);
    entry.working_dir = field(&["dir", "workingDir"]).and_then(scalar_to_string);
    entry
}

fn command_from_value(value: &Value) -> Option<ToolingCommand> {
    match value {
        Value::String(s) => Some(ToolingCommand::Single(s.clone())),
        Value::Sequence(items) => {
            let steps: Option<Vec<String>> = items.iter().map(scalar_to_string).collect();
            steps
                .filter(|steps| !steps.is_empty())
                .map(ToolingCommand::Steps)
        }
        _ => None,
    }
}

fn mapping_or_warn<'a>(value: Option<&'a Value>, key: &str, path: &Path) -> Option<&'a Mapping> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Mapping(map)) => Some(map),
        Some(other) => {
            warn!("{:?}: ignoring '{}' declared as {}", path, key, kind_of(other));
            None
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn directory_name(definition_path: &Path) -> String {
    definition_path
        .parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("app")
        .to_string()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("/work/my-site/.lando.yml")
    }

    #[test]
    fn test_full_document() {
        let text = r#"
name: mysite
recipe: drupal11
config:
  webroot: web
services:
  appserver:
    type: php:8.3
  cache:
    type: redis:7
  node:
    type: node
tooling:
  custom-script: ./scripts/custom.sh
  build:
    service: node
    description: Build the theme
    dir: /app/web/themes/custom
    cmd:
      - npm ci
      - npm run build
"#;
        let app = parse(text, &path()).unwrap();

        assert_eq!(app.name, "mysite");
        assert_eq!(app.recipe.as_deref(), Some("drupal11"));
        let services: Vec<_> = app.services.keys().map(String::as_str).collect();
        assert_eq!(services, vec!["appserver", "cache", "node"]);
        assert_eq!(app.services["cache"], ServiceDescriptor::new("redis", Some("7")));

        let custom = app.tool("custom-script").unwrap();
        assert_eq!(custom.command, ToolingCommand::Single("./scripts/custom.sh".to_string()));
        assert_eq!(custom.service, None);

        let build = app.tool("build").unwrap();
        assert_eq!(build.service.as_deref(), Some("node"));
        assert_eq!(build.working_dir.as_deref(), Some("/app/web/themes/custom"));
        assert_eq!(build.command.steps(), vec!["npm ci", "npm run build"]);
    }

    #[test]
    fn test_missing_name_uses_directory() {
        let app = parse("recipe: lamp\n", &path()).unwrap();
        assert_eq!(app.name, "my-site");
    }

    #[test]
    fn test_empty_document_is_not_an_error() {
        let app = parse("", &path()).unwrap();
        assert_eq!(app.name, "my-site");
        assert!(app.recipe.is_none());
        assert!(app.services.is_empty());
        assert!(app.tooling.is_empty());
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = parse("name: [unclosed\n", &path()).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_top_level_sequence_is_parse_error() {
        let err = parse("- name: site\n", &path()).unwrap_err();
        match err {
            Error::ParseError { path: p, message } => {
                assert_eq!(p, path());
                assert!(message.contains("a sequence"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_command_synonyms_and_defaults() {
        let text = r#"
tooling:
  node:
    service: node
  yarn:
    service: node
    command: yarn
    workingDir: /app/frontend
"#;
        let app = parse(text, &path()).unwrap();
        assert_eq!(app.tool("node").unwrap().command, ToolingCommand::from("node"));
        let yarn = app.tool("yarn").unwrap();
        assert_eq!(yarn.command, ToolingCommand::from("yarn"));
        assert_eq!(yarn.working_dir.as_deref(), Some("/app/frontend"));
    }

    #[test]
    fn test_disabled_tooling_and_untyped_services() {
        let text = r#"
recipe: drupal11
services:
  appserver:
    xdebug: true
tooling:
  drush: false
  terminus: disabled
"#;
        let document = parse_document(text, &path()).unwrap();
        let definition = parse_definition(&document, &path()).unwrap();
        assert_eq!(definition.disabled_tooling, vec!["drush", "terminus"]);
        assert_eq!(definition.untyped_services, vec!["appserver"]);
        assert!(definition.descriptor.tooling.is_empty());
    }

    #[test]
    fn test_numeric_name_is_stringified() {
        let app = parse("name: 2024\n", &path()).unwrap();
        assert_eq!(app.name, "2024");
    }
}
