use crate::store::PersistentStore;
use sha2::{Digest, Sha256};
use std::{error::Error, path::PathBuf};

// Keeps file names well below the common 255 byte limit.
const MAX_FILE_NAME_LEN: usize = 192;
const KEPT_PREFIX_LEN: usize = 120;

fn encode_key(key: &str) -> String {
    let mut result = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_') {
            result.push(byte as char);
        } else {
            result.push_str(&format!("%{byte:02X}"));
        }
    }
    if result.len() > MAX_FILE_NAME_LEN {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        // Escaped names are plain ASCII, so any byte index is a char boundary.
        result.truncate(KEPT_PREFIX_LEN);
        result.push('~');
        result.push_str(&format!("{:x}", hasher.finalize()));
    }
    result
}

/// Persistent store keeping every entry as a file in the root directory.
/// Keys are escaped into flat file names.
#[derive(Debug, Default, Clone)]
pub struct FileStore {
    pub root: PathBuf,
}

impl FileStore {
    /// Sets the root directory for stored entries.
    ///
    /// # Arguments
    /// - `root`: The directory entries are stored in. Created on first write.
    ///
    /// # Returns
    /// - A modified `FileStore` instance with the new root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.root.join(encode_key(key))
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let file_path = self.file_path(key);
        if !file_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&file_path).map_err(|error| {
            format!("Failed to read `{:?}` store entry: {}", file_path, error)
        })?;
        Ok(Some(content))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        std::fs::create_dir_all(&self.root)?;
        let file_path = self.file_path(key);
        std::fs::write(&file_path, value).map_err(|error| {
            format!("Failed to write `{:?}` store entry: {}", file_path, error)
        })?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), Box<dyn Error>> {
        let file_path = self.file_path(key);
        if file_path.exists() {
            std::fs::remove_file(&file_path)?;
        }
        Ok(())
    }
}
