//! Layering of definition files
//!
//! A directory may hold a base `.lando.yml` plus variant siblings. They stack
//! in a fixed order: mappings merge key by key, scalars and sequences from a
//! later layer replace the earlier value.

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One parsed definition file
#[derive(Debug, Clone)]
pub struct DefinitionLayer {
    pub path: PathBuf,
    pub document: Value,
}

#[derive(Debug, Default)]
pub struct LayerMerger {
    layers: Vec<DefinitionLayer>,
}

impl LayerMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers must be pushed lowest precedence first.
    pub fn push(&mut self, layer: DefinitionLayer) {
        self.layers.push(layer);
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.layers.iter().map(|layer| layer.path.as_path())
    }

    /// Merge every pushed layer into a single document
    pub fn merged(&self) -> Value {
        let mut merged = Value::Null;
        for layer in &self.layers {
            debug!("Applying definition layer {:?}", layer.path);
            merge_values(&mut merged, layer.document.clone());
        }
        merged
    }
}

/// Merge `overlay` into `base`.
///
/// An empty (null) document on top leaves the base untouched, so an empty
/// variant file is harmless.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if value.is_mapping() && existing.is_mapping() => {
                        merge_values(existing, value);
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
