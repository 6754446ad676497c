pub mod config;
pub mod events;
pub mod resolve;

use crate::{
    catalog::{CatalogConfig, ResourceCatalog, ResourceKind},
    environment::{ModuleDefiner, ModuleEnvironment},
    error::LoaderError,
    fetch::{Completion, DispatchOutcome, FetchCoordinator, FetchFailure, Transport},
    id::ModuleId,
    loader::{
        config::LoaderConfig,
        events::{LoaderEvent, LoaderEventBindings, LoaderEventKind},
    },
    registry::{Exports, ModuleRegistry, factory::ModuleFactory},
    store::PersistentStore,
};

/// Work scheduled to run once a module gets registered or fails to.
pub(crate) type Continuation = Box<dyn FnOnce(&mut ModuleLoader, Result<(), LoaderError>)>;

/// Dependency-aware module loader.
///
/// Owns the resource catalog, the module registry and the fetch coordinator.
/// Everything happens on the thread that owns the loader: transports are
/// polled and completions processed only inside [`ModuleLoader::maintain`],
/// while callbacks receive the loader back so they can keep working with it.
pub struct ModuleLoader {
    pub catalog: ResourceCatalog,
    pub registry: ModuleRegistry,
    pub events: LoaderEventBindings,
    fetch: FetchCoordinator,
}

impl ModuleLoader {
    pub fn new(
        transport: impl Transport + 'static,
        environment: impl ModuleEnvironment + 'static,
    ) -> Self {
        Self {
            catalog: Default::default(),
            registry: Default::default(),
            events: Default::default(),
            fetch: FetchCoordinator::new(transport, environment),
        }
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn with_store(mut self, store: impl PersistentStore + 'static) -> Self {
        self.set_store(store);
        self
    }

    pub fn with_catalog(mut self, config: CatalogConfig) -> Self {
        self.merge(config);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        self.fetch.config()
    }

    /// Replaces loader settings. Should happen before anything was dispatched,
    /// otherwise in-flight retrievals keep their old deadlines and cached
    /// entries may end up split across prefixes.
    pub fn set_config(&mut self, config: LoaderConfig) {
        if self.fetch.has_dispatched() && self.fetch.config() != &config {
            log::warn!("Loader configuration changed after locations were already dispatched");
        }
        self.fetch.set_config(config);
    }

    pub fn set_store(&mut self, store: impl PersistentStore + 'static) {
        if self.fetch.has_dispatched() {
            log::warn!("Persistent store replaced after locations were already dispatched");
        }
        self.fetch.set_store(store);
    }

    pub fn fetch_coordinator(&self) -> &FetchCoordinator {
        &self.fetch
    }

    pub fn merge(&mut self, config: CatalogConfig) {
        self.catalog.merge(config);
    }

    pub fn merge_json(&mut self, content: &str) -> Result<(), LoaderError> {
        self.catalog.merge_json(content)
    }

    /// Registers a module and notifies everyone waiting for it, in the order
    /// they started waiting.
    pub fn define(&mut self, id: impl Into<ModuleId>, factory: impl Into<ModuleFactory>) {
        self.define_many([(id.into(), factory.into())]);
    }

    /// Registers all modules first and only then notifies their waiters.
    pub fn define_many<I, F>(&mut self, definitions: impl IntoIterator<Item = (I, F)>)
    where
        I: Into<ModuleId>,
        F: Into<ModuleFactory>,
    {
        let mut ids = vec![];
        for (id, factory) in definitions {
            let id = id.into();
            self.registry.define(id.clone(), factory.into());
            self.emit(LoaderEventKind::Defined, Some(&id), None);
            ids.push(id);
        }
        for id in ids {
            self.notify(&id, Ok(()));
        }
    }

    pub fn request(&mut self, id: &str) -> Result<Exports, LoaderError> {
        self.registry.request(id)
    }

    /// Makes sure `id` gets registered, fetching its location when needed.
    ///
    /// Calls `on_ready` once the module is registered (right away if it
    /// already is), or `on_error` when its location fails to deliver it.
    pub fn fetch(
        &mut self,
        id: impl Into<ModuleId>,
        on_ready: impl FnOnce(&mut ModuleLoader) + 'static,
        on_error: impl FnOnce(&mut ModuleLoader, LoaderError) + 'static,
    ) {
        self.wait(
            id.into(),
            Box::new(move |loader, result| match result {
                Ok(()) => on_ready(loader),
                Err(error) => on_error(loader, error),
            }),
        );
    }

    /// Dispatches a location without waiting for any module in particular.
    /// Modules its script defines get registered as usual.
    pub fn preload(&mut self, location: impl AsRef<str>) {
        let location = location.as_ref();
        match self
            .fetch
            .dispatch(None, location, ResourceKind::from_location(location))
        {
            DispatchOutcome::Started => {
                self.emit(LoaderEventKind::Dispatched, None, Some(location));
            }
            DispatchOutcome::Completed(completion) => {
                if !completion.cached {
                    self.emit(LoaderEventKind::Dispatched, None, Some(location));
                }
                self.complete(completion);
            }
            DispatchOutcome::Joined | DispatchOutcome::Settled(_) => {}
        }
    }

    /// Polls transports, reports timeouts and processes every delivered
    /// location.
    pub fn maintain(&mut self) {
        let (completions, late) = self.fetch.maintain();
        for location in late {
            log::warn!("Ignoring late completion of `{location}` that already timed out");
            self.emit(LoaderEventKind::LateCompletionIgnored, None, Some(&location));
        }
        for completion in completions {
            self.complete(completion);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.fetch.in_flight_count() > 0
    }

    /// Ids that have someone waiting for their registration.
    pub fn pending_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.fetch.pending_ids()
    }

    pub(crate) fn wait(&mut self, id: ModuleId, continuation: Continuation) {
        if self.registry.is_defined(&id) {
            continuation(self, Ok(()));
            return;
        }
        self.fetch.enqueue(id.clone(), continuation);
        self.dispatch(&id);
    }

    fn dispatch(&mut self, id: &ModuleId) {
        let location = self.catalog.resolve_location(id);
        let kind = ResourceKind::from_location(&location);
        match self.fetch.dispatch(Some(id), &location, kind) {
            DispatchOutcome::Started => {
                self.emit(LoaderEventKind::Dispatched, Some(id), Some(&location));
            }
            DispatchOutcome::Joined => {}
            DispatchOutcome::Completed(completion) => {
                if !completion.cached {
                    self.emit(LoaderEventKind::Dispatched, Some(id), Some(&location));
                }
                self.complete(completion);
            }
            DispatchOutcome::Settled(Ok(())) => match kind {
                ResourceKind::Style => self.notify(id, Ok(())),
                ResourceKind::Script => self.notify(
                    id,
                    Err(FetchFailure::NotDefined.into_error(id.clone(), &location)),
                ),
            },
            DispatchOutcome::Settled(Err(failure)) => {
                self.notify(id, Err(failure.into_error(id.clone(), &location)));
            }
        }
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            location,
            kind,
            ids,
            result,
            cached,
        } = completion;
        if cached {
            self.emit(LoaderEventKind::CacheHit, ids.first(), Some(&location));
        }

        let result = result.and_then(|content| self.execute(&location, kind, &content));
        match &result {
            Ok(()) => match kind {
                ResourceKind::Script => {
                    log::debug!("Delivered `{location}`");
                    self.emit(LoaderEventKind::Delivered, None, Some(&location));
                }
                ResourceKind::Style => {
                    log::debug!("Attached `{location}` style");
                    self.emit(LoaderEventKind::StyleAttached, None, Some(&location));
                }
            },
            Err(failure) => {
                log::debug!("Fetching `{location}` failed: {failure:?}");
                self.fetch.settle(&location, Err(failure.clone()));
                let kind = match failure {
                    FetchFailure::Timeout(_) => LoaderEventKind::FetchTimedOut,
                    _ => LoaderEventKind::FetchFailed,
                };
                self.emit(kind, None, Some(&location));
            }
        }

        for id in ids {
            match &result {
                Ok(()) if kind == ResourceKind::Style => self.notify(&id, Ok(())),
                Ok(()) if self.registry.is_defined(&id) => {}
                Ok(()) => self.notify(
                    &id,
                    Err(FetchFailure::NotDefined.into_error(id.clone(), &location)),
                ),
                Err(failure) => {
                    self.notify(&id, Err(failure.clone().into_error(id.clone(), &location)))
                }
            }
        }
    }

    fn execute(
        &mut self,
        location: &str,
        kind: ResourceKind,
        content: &str,
    ) -> Result<(), FetchFailure> {
        match kind {
            ResourceKind::Style => self
                .fetch
                .environment_mut()
                .attach_style(location, content)
                .map_err(|error| FetchFailure::Execution(error.to_string())),
            ResourceKind::Script => {
                let mut definer = ModuleDefiner::default();
                self.fetch
                    .environment_mut()
                    .execute_script(location, content, &mut definer)
                    .map_err(|error| FetchFailure::Execution(error.to_string()))?;
                self.define_many(definer.into_definitions());
                Ok(())
            }
        }
    }

    fn notify(&mut self, id: &ModuleId, result: Result<(), LoaderError>) {
        for continuation in self.fetch.take_waiters(id) {
            continuation(self, result.clone());
        }
    }

    pub(crate) fn emit(
        &mut self,
        kind: LoaderEventKind,
        id: Option<&ModuleId>,
        location: Option<&str>,
    ) {
        if self.events.is_empty() {
            return;
        }
        let event = LoaderEvent {
            kind,
            id: id.cloned(),
            location: location.map(ToOwned::to_owned),
        };
        if let Err(error) = self.events.dispatch(event) {
            log::warn!("Loader event listener failed: {error}");
        }
    }
}
