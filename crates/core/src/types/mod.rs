pub mod app;
pub mod status;

// Re-export commonly used types
pub use app::{AppDescriptor, ServiceDescriptor, ToolingCommand, ToolingEntry};
pub use status::{AppStatus, LifecycleOperation};
