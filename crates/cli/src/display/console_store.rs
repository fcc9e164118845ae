use lando_dock_core::Result;
use lando_dock_core::context::{ContextStore, ContextValue};
use std::collections::BTreeMap;

/// Prints visibility flags as they change
#[derive(Debug, Default)]
pub struct ConsoleContextStore {
    values: BTreeMap<String, ContextValue>,
}

impl ContextStore for ConsoleContextStore {
    fn set(&mut self, key: &str, value: ContextValue) -> Result<()> {
        if self.values.get(key) != Some(&value) {
            println!("   🏷️  {key} = {value}");
            self.values.insert(key.to_string(), value);
        }
        Ok(())
    }
}
