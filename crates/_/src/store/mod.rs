pub mod file;
pub mod memory;

use std::error::Error;

/// Persistent key-value storage of raw resource content.
///
/// Used by cache-assisted delivery with two kinds of keys: a location maps to
/// the content fetched from it, and a prefixed module id maps to the last
/// location that module was fetched from.
pub trait PersistentStore {
    /// Reads value stored under `key`.
    ///
    /// # Returns
    /// - `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>>;

    /// Removes value stored under `key`. Missing keys are not an error.
    fn delete(&self, key: &str) -> Result<(), Box<dyn Error>>;
}
