//! Configuration for lando-dock: user settings and definition-file layering

pub mod merge;
mod settings;

// Re-export main types
pub use merge::{DefinitionLayer, LayerMerger, merge_values};
pub use settings::{InterceptSettings, SETTINGS_FILE_NAME, Settings};
