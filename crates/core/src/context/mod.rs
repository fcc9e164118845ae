//! Visibility flags published to the host
//!
//! The projector recomputes every flag from the registry on each registry
//! event and writes all of them to a [`ContextStore`]. Writing the same
//! values again changes nothing for readers of the store.

use crate::{
    error::Result,
    registry::{AppRegistry, RegistryEvent, RegistryListener},
    types::AppStatus,
};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

pub const HAS_APPS: &str = "lando:hasApps";
pub const HAS_ACTIVE_APP: &str = "lando:hasActiveApp";
pub const APP_RUNNING: &str = "lando:appRunning";
pub const APP_BUILDING: &str = "lando:appBuilding";
pub const ACTIVE_APP: &str = "lando:activeApp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Str(String),
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Bool(b) => write!(f, "{b}"),
            ContextValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFlags {
    pub has_apps: bool,
    pub has_active_app: bool,
    pub app_running: bool,
    pub app_building: bool,
    pub active_app: Option<String>,
}

impl ContextFlags {
    pub fn derive(registry: &AppRegistry) -> Self {
        let active = registry.active();
        let status = active.map(|app| app.status);
        Self {
            has_apps: !registry.is_empty(),
            has_active_app: active.is_some(),
            app_running: matches!(status, Some(AppStatus::Running | AppStatus::Restarting)),
            app_building: matches!(
                status,
                Some(AppStatus::Starting | AppStatus::Rebuilding | AppStatus::Destroying)
            ),
            active_app: active.map(|app| app.name.clone()),
        }
    }

    /// Key/value pairs in publication order
    pub fn entries(&self) -> Vec<(&'static str, ContextValue)> {
        vec![
            (HAS_APPS, self.has_apps.into()),
            (HAS_ACTIVE_APP, self.has_active_app.into()),
            (APP_RUNNING, self.app_running.into()),
            (APP_BUILDING, self.app_building.into()),
            (
                ACTIVE_APP,
                ContextValue::Str(self.active_app.clone().unwrap_or_default()),
            ),
        ]
    }
}

/// The host's visibility-condition store
pub trait ContextStore {
    fn set(&mut self, key: &str, value: ContextValue) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryContext {
    values: BTreeMap<String, ContextValue>,
    writes: usize,
}

/// In-memory store; clones share the same values
#[derive(Debug, Clone, Default)]
pub struct MemoryContextStore {
    inner: Rc<RefCell<MemoryContext>>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<ContextValue> {
        self.inner.borrow().values.get(key).cloned()
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(ContextValue::Bool(true)))
    }

    pub fn values(&self) -> BTreeMap<String, ContextValue> {
        self.inner.borrow().values.clone()
    }

    /// Total number of `set` calls
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }
}

impl ContextStore for MemoryContextStore {
    fn set(&mut self, key: &str, value: ContextValue) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.values.insert(key.to_string(), value);
        inner.writes += 1;
        Ok(())
    }
}

pub struct ContextProjector<S> {
    store: S,
    last: Option<ContextFlags>,
}

impl<S: ContextStore> ContextProjector<S> {
    pub fn new(store: S) -> Self {
        Self { store, last: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Flags from the most recent projection
    pub fn last(&self) -> Option<&ContextFlags> {
        self.last.as_ref()
    }

    /// Derive the flags from `registry` and publish every one of them.
    pub fn project(&mut self, registry: &AppRegistry) -> ContextFlags {
        let flags = ContextFlags::derive(registry);
        for (key, value) in flags.entries() {
            if let Err(e) = self.store.set(key, value) {
                warn!("Failed to publish {}: {}", key, e);
            }
        }
        if self.last.as_ref() != Some(&flags) {
            debug!("Context: {:?}", flags);
        }
        self.last = Some(flags.clone());
        flags
    }
}

impl<S: ContextStore> RegistryListener for ContextProjector<S> {
    fn on_event(&mut self, _event: &RegistryEvent, registry: &AppRegistry) {
        self.project(registry);
    }
}
