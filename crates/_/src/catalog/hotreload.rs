use crate::catalog::{CatalogConfig, ResourceCatalog};
use notify::{Config, Event, PollWatcher, RecursiveMode, Result as NotifyResult, Watcher};
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::mpsc::{Receiver, channel},
};

/// Watches a catalog manifest file and merges it again whenever it changes.
///
/// Polling is manual and happens in [`CatalogWatcher::maintain`], so the
/// watcher can be ticked together with the loader.
pub struct CatalogWatcher {
    path: PathBuf,
    watcher: PollWatcher,
    rx: Receiver<NotifyResult<Event>>,
}

impl CatalogWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let path = path.into();
        let (tx, rx) = channel::<NotifyResult<Event>>();
        let mut watcher = PollWatcher::new(
            tx,
            Config::default()
                .with_manual_polling()
                .with_compare_contents(true),
        )?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        Ok(Self { path, watcher, rx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the manifest and merges it into `catalog`.
    pub fn load(&self, catalog: &mut ResourceCatalog) -> Result<(), Box<dyn Error>> {
        let content = std::fs::read_to_string(&self.path).map_err(|error| {
            format!(
                "Failed to read catalog manifest `{:?}`: {}",
                self.path, error
            )
        })?;
        catalog.merge(CatalogConfig::from_json(&content)?);
        Ok(())
    }

    /// Merges the manifest again if it was modified since the last call.
    ///
    /// # Returns
    /// - `true` when the catalog got reloaded.
    pub fn maintain(&mut self, catalog: &mut ResourceCatalog) -> Result<bool, Box<dyn Error>> {
        self.watcher.poll()?;
        let mut modified = false;
        while let Ok(Ok(event)) = self.rx.try_recv() {
            if event.kind.is_modify() || event.kind.is_create() {
                modified = true;
            }
        }
        if modified {
            log::info!("Catalog manifest `{:?}` changed, reloading", self.path);
            self.load(catalog)?;
        }
        Ok(modified)
    }
}
