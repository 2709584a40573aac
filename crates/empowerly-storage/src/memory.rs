use anyhow::Result;
use std::collections::HashMap;

use crate::KeyValueStore;

/// In-process storage with the same contract as [`crate::Database`].
///
/// Used by tests and by hosts that do not need persistence across restarts.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed storage with raw values, bypassing any validation
    #[must_use]
    pub fn with_items(items: &[(&str, &str)]) -> Self {
        Self {
            items: items
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_items(&mut self, items: &[(&str, &str)]) -> Result<()> {
        for (key, value) in items {
            self.items.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_items(&mut self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.items.remove(*key);
        }
        Ok(())
    }
}
