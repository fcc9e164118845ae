use super::AppRegistry;
use crate::types::AppStatus;
use std::path::PathBuf;

/// Change notifications emitted by the registry after a mutation is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Descriptors were added, replaced or removed
    AppsChanged,
    ActiveAppChanged { name: Option<String> },
    StatusChanged {
        name: String,
        definition_path: PathBuf,
        from: AppStatus,
        to: AppStatus,
    },
}

/// Receives every registry event synchronously, with read access to the
/// registry in its post-mutation state.
pub trait RegistryListener {
    fn on_event(&mut self, event: &RegistryEvent, registry: &AppRegistry);
}

impl<F> RegistryListener for F
where
    F: FnMut(&RegistryEvent, &AppRegistry),
{
    fn on_event(&mut self, event: &RegistryEvent, registry: &AppRegistry) {
        self(event, registry)
    }
}
