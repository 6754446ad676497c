use crate::fetch::{Transport, TransportFuture};
use std::{error::Error, path::PathBuf};

/// Transport reading locations as files relative to the root directory.
#[derive(Debug, Default, Clone)]
pub struct FileTransport {
    pub root: PathBuf,
}

impl FileTransport {
    /// Sets the root directory for file-based retrieval.
    ///
    /// # Arguments
    /// - `root`: The root path locations are resolved against.
    ///
    /// # Returns
    /// - A modified `FileTransport` instance with the new root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

impl Transport for FileTransport {
    fn retrieve(&mut self, location: &str) -> TransportFuture {
        let file_path = self.root.join(location);
        let result = std::fs::read_to_string(&file_path).map_err(|error| -> Box<dyn Error> {
            format!("Failed to load `{:?}` file content: {}", file_path, error).into()
        });
        Box::pin(std::future::ready(result))
    }
}
