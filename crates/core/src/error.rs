use std::io;
use std::path::PathBuf;

use crate::types::{AppStatus, LifecycleOperation};

/// Errors that can occur during lando-dock operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error in {}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("No app named '{0}'")]
    NoSuchApp(String),

    #[error("No active app selected")]
    NoActiveApp,

    #[error("App '{app}' is busy ({status}); wait for it to finish")]
    OperationInProgress { app: String, status: AppStatus },

    #[error("Cannot {operation} app '{app}' while it is {status}")]
    InvalidTransition {
        app: String,
        status: AppStatus,
        operation: LifecycleOperation,
    },

    #[error("lando {operation} failed for '{app}': {diagnostics}")]
    ExternalCommandFailed {
        app: String,
        operation: String,
        diagnostics: String,
    },

    #[error("Configuration write failed: {0}")]
    ConfigurationWriteFailed(String),

    #[error("App '{app}' has no tooling command named '{tool}'")]
    UnknownTooling { app: String, tool: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short message suitable for a notification popup.
    ///
    /// External command failures keep only the last non-empty diagnostic line,
    /// the full text is still available through `Display`.
    pub fn user_message(&self) -> String {
        match self {
            Error::ExternalCommandFailed {
                app,
                operation,
                diagnostics,
            } => {
                let last_line = diagnostics
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or("no output");
                format!("Could not {operation} '{app}': {last_line}")
            }
            Error::NoActiveApp => {
                "No Lando app selected. Select an app first.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for lando-dock operations
pub type Result<T> = std::result::Result<T, Error>;
