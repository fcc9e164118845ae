//! lando-dock-core - Lando app discovery and control for editor integrations
//!
//! This crate provides functionality to:
//! - Discover `.lando.yml` apps in workspace folders and merge recipe defaults
//! - Track the active app and drive each app's lifecycle through the lando CLI
//! - Publish visibility flags for menus and commands
//! - Redirect `php` in integrated terminals into the active app's container
pub mod config;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod parser;
pub mod recipes;
pub mod registry;
pub mod session;
pub mod shim;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Re-export main API components
pub use config::Settings;
pub use context::{ContextFlags, ContextProjector, ContextStore, MemoryContextStore};
pub use interceptor::{
    JsonSettingsStore, MemoryEnvStore, RestorePoints, TerminalEnvInterceptor, TerminalEnvStore,
    TerminalPlatform,
};
pub use lifecycle::{CliRunner, CommandOutput, LifecycleController, PowerOffOutcome, SystemRunner};
pub use registry::{AppRegistry, ScanReport};
pub use session::Session;
