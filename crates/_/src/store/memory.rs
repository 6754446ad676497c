use crate::store::PersistentStore;
use std::{
    collections::HashMap,
    error::Error,
    sync::{Arc, RwLock},
};

/// In-memory persistent store. Clones share the same storage, which lets
/// several loaders (or a loader and a test) observe one cache.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn with(self, key: impl ToString, value: impl ToString) -> Self {
        if let Ok(mut items) = self.items.write() {
            items.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items
            .read()
            .map(|items| items.contains_key(key))
            .unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items
            .read()
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self
            .items
            .read()
            .map_err(|error| format!("{}", error))?
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        self.items
            .write()
            .map_err(|error| format!("{}", error))?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), Box<dyn Error>> {
        self.items
            .write()
            .map_err(|error| format!("{}", error))?
            .remove(key);
        Ok(())
    }
}
