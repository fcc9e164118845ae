//! Definition file discovery and parsing

pub mod discovery;
pub mod landofile;

// Re-export commonly used items
pub use discovery::{BASE_FILE_NAME, DefinitionFileKind, is_definition_file, order_layers};
pub use landofile::{Definition, parse, parse_definition, parse_document};
