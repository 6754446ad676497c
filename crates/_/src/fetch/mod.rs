pub mod deferred;
pub mod file;
pub mod future;
pub mod memory;

use crate::{
    catalog::ResourceKind,
    environment::ModuleEnvironment,
    error::LoaderError,
    id::ModuleId,
    loader::{Continuation, config::LoaderConfig},
    store::{PersistentStore, memory::MemoryStore},
};
use std::{
    collections::HashMap,
    error::Error,
    pin::Pin,
    task::{Context, Poll, Waker},
    time::{Duration, Instant},
};

/// Pending retrieval of a location's raw content.
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<String, Box<dyn Error>>>>>;

/// Capability of retrieving raw content of a location.
///
/// Returned futures are polled with a no-op waker, once right after dispatch
/// and then on every loader maintenance pass, so they must make progress on
/// their own (worker threads, an external runtime) or complete immediately.
pub trait Transport {
    fn retrieve(&mut self, location: &str) -> TransportFuture;
}

/// Reason a location failed to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// No completion signal arrived within the configured timeout.
    Timeout(Duration),
    /// Transport reported an error.
    Transport(String),
    /// Environment failed to run delivered content.
    Execution(String),
    /// Script ran but did not define the module that was waiting for it.
    NotDefined,
}

impl FetchFailure {
    pub fn into_error(self, id: ModuleId, location: impl ToString) -> LoaderError {
        let location = location.to_string();
        match self {
            Self::Timeout(timeout) => LoaderError::FetchTimeout {
                id,
                location,
                timeout,
            },
            Self::Transport(message) => LoaderError::UnknownTransport {
                id,
                location,
                message,
            },
            Self::Execution(message) => LoaderError::Execution {
                id,
                location,
                message,
            },
            Self::NotDefined => LoaderError::NotDefined { id, location },
        }
    }
}

/// Observable state of a dispatched location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationStatus {
    InFlight,
    Delivered,
    Failed(FetchFailure),
}

pub(crate) struct Completion {
    pub location: String,
    pub kind: ResourceKind,
    pub ids: Vec<ModuleId>,
    pub result: Result<String, FetchFailure>,
    pub cached: bool,
}

pub(crate) enum DispatchOutcome {
    /// New transport operation is in flight.
    Started,
    /// Location is already in flight, the caller joined it.
    Joined,
    /// Content is available right away and has to be processed.
    Completed(Completion),
    /// Location was settled before, nothing gets dispatched.
    Settled(Result<(), FetchFailure>),
}

struct InFlight {
    kind: ResourceKind,
    owner: Option<ModuleId>,
    ids: Vec<ModuleId>,
    future: TransportFuture,
    deadline: Option<Instant>,
    sequence: usize,
}

enum LocationState {
    InFlight(InFlight),
    Settled(Result<(), FetchFailure>),
}

/// Dispatches locations to the transport at most once each, keeps the wait
/// queues of modules expecting registration, delivers from the persistent
/// store when possible and races every network retrieval against a timeout.
pub struct FetchCoordinator {
    config: LoaderConfig,
    transport: Box<dyn Transport>,
    environment: Box<dyn ModuleEnvironment>,
    store: Box<dyn PersistentStore>,
    locations: HashMap<String, LocationState>,
    waiting: HashMap<ModuleId, Vec<Continuation>>,
    detached: Vec<(String, TransportFuture)>,
    sequence: usize,
}

impl FetchCoordinator {
    pub fn new(
        transport: impl Transport + 'static,
        environment: impl ModuleEnvironment + 'static,
    ) -> Self {
        Self {
            config: Default::default(),
            transport: Box::new(transport),
            environment: Box::new(environment),
            store: Box::new(MemoryStore::default()),
            locations: Default::default(),
            waiting: Default::default(),
            detached: Default::default(),
            sequence: 0,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn has_dispatched(&self) -> bool {
        !self.locations.is_empty()
    }

    pub fn location_status(&self, location: &str) -> Option<LocationStatus> {
        self.locations.get(location).map(|state| match state {
            LocationState::InFlight(_) => LocationStatus::InFlight,
            LocationState::Settled(Ok(())) => LocationStatus::Delivered,
            LocationState::Settled(Err(failure)) => LocationStatus::Failed(failure.clone()),
        })
    }

    pub fn in_flight_count(&self) -> usize {
        self.locations
            .values()
            .filter(|state| matches!(state, LocationState::InFlight(_)))
            .count()
    }

    /// Number of timed out retrievals still running in the background.
    pub fn detached_count(&self) -> usize {
        self.detached.len()
    }

    pub fn pending_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.waiting.keys()
    }

    pub(crate) fn set_config(&mut self, config: LoaderConfig) {
        self.config = config;
    }

    pub(crate) fn set_store(&mut self, store: impl PersistentStore + 'static) {
        self.store = Box::new(store);
    }

    pub(crate) fn environment_mut(&mut self) -> &mut dyn ModuleEnvironment {
        self.environment.as_mut()
    }

    pub(crate) fn enqueue(&mut self, id: ModuleId, continuation: Continuation) {
        self.waiting.entry(id).or_default().push(continuation);
    }

    pub(crate) fn take_waiters(&mut self, id: &str) -> Vec<Continuation> {
        self.waiting.remove(id).unwrap_or_default()
    }

    pub(crate) fn settle(&mut self, location: &str, result: Result<(), FetchFailure>) {
        self.locations
            .insert(location.to_owned(), LocationState::Settled(result));
    }

    pub(crate) fn dispatch(
        &mut self,
        id: Option<&ModuleId>,
        location: &str,
        kind: ResourceKind,
    ) -> DispatchOutcome {
        match self.locations.get_mut(location) {
            Some(LocationState::InFlight(flight)) => {
                if let Some(id) = id {
                    if !flight.ids.contains(id) {
                        flight.ids.push(id.clone());
                    }
                }
                return DispatchOutcome::Joined;
            }
            Some(LocationState::Settled(result)) => return DispatchOutcome::Settled(result.clone()),
            None => {}
        }

        if self.config.cache_assisted {
            if let Some(content) = self.cached_content(id, location) {
                self.settle(location, Ok(()));
                return DispatchOutcome::Completed(Completion {
                    location: location.to_owned(),
                    kind,
                    ids: id.cloned().into_iter().collect(),
                    result: Ok(content),
                    cached: true,
                });
            }
        }

        log::debug!("Dispatching `{location}` to transport");
        let future = self.transport.retrieve(location);
        self.sequence = self.sequence.wrapping_add(1);
        self.locations.insert(
            location.to_owned(),
            LocationState::InFlight(InFlight {
                kind,
                owner: id.cloned(),
                ids: id.cloned().into_iter().collect(),
                future,
                deadline: Instant::now().checked_add(self.config.timeout),
                sequence: self.sequence,
            }),
        );
        match self.poll_flight(location, false) {
            Some(completion) => DispatchOutcome::Completed(completion),
            None => DispatchOutcome::Started,
        }
    }

    /// Polls every in-flight retrieval and runs the timeout watchdog.
    ///
    /// # Returns
    /// - Completions in dispatch order.
    /// - Locations whose retrieval finished after it had already timed out.
    pub(crate) fn maintain(&mut self) -> (Vec<Completion>, Vec<String>) {
        let mut cx = Context::from_waker(Waker::noop());
        let mut late = vec![];
        self.detached
            .retain_mut(|(location, future)| match future.as_mut().poll(&mut cx) {
                Poll::Ready(_) => {
                    late.push(location.clone());
                    false
                }
                Poll::Pending => true,
            });

        let mut in_flight = self
            .locations
            .iter()
            .filter_map(|(location, state)| match state {
                LocationState::InFlight(flight) => Some((flight.sequence, location.clone())),
                LocationState::Settled(_) => None,
            })
            .collect::<Vec<_>>();
        in_flight.sort();
        let completions = in_flight
            .into_iter()
            .filter_map(|(_, location)| self.poll_flight(&location, true))
            .collect();
        (completions, late)
    }

    fn poll_flight(&mut self, location: &str, watchdog: bool) -> Option<Completion> {
        let Some(LocationState::InFlight(flight)) = self.locations.get_mut(location) else {
            return None;
        };
        // An expired deadline wins over completions not observed before it.
        let expired = watchdog
            && flight
                .deadline
                .map(|deadline| Instant::now() >= deadline)
                .unwrap_or_default();
        let result = if expired {
            Err(FetchFailure::Timeout(self.config.timeout))
        } else {
            let mut cx = Context::from_waker(Waker::noop());
            match flight.future.as_mut().poll(&mut cx) {
                Poll::Ready(Ok(content)) => Ok(content),
                Poll::Ready(Err(error)) => Err(FetchFailure::Transport(error.to_string())),
                Poll::Pending => return None,
            }
        };

        let settled = result.as_ref().map(|_| ()).map_err(|failure| failure.clone());
        let Some(LocationState::InFlight(flight)) = self
            .locations
            .insert(location.to_owned(), LocationState::Settled(settled))
        else {
            return None;
        };
        let InFlight {
            kind,
            owner,
            ids,
            future,
            ..
        } = flight;
        match &result {
            Ok(content) => {
                if self.config.cache_assisted {
                    self.store_content(owner.as_ref(), location, content);
                }
            }
            Err(FetchFailure::Timeout(_)) => {
                log::debug!("Retrieval of `{location}` timed out, detaching it");
                self.detached.push((location.to_owned(), future));
            }
            Err(_) => {}
        }
        Some(Completion {
            location: location.to_owned(),
            kind,
            ids,
            result,
            cached: false,
        })
    }

    fn id_key(&self, id: &ModuleId) -> String {
        format!("{}{}", self.config.cache_prefix, id)
    }

    fn cached_content(&self, id: Option<&ModuleId>, location: &str) -> Option<String> {
        let content = match self.store.get(location) {
            Ok(content) => content?,
            Err(error) => {
                log::warn!("Failed to read `{location}` from persistent store: {error}");
                return None;
            }
        };
        if let Some(id) = id {
            let key = self.id_key(id);
            match self.store.get(&key) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    if let Err(error) = self.store.put(&key, location) {
                        log::warn!("Failed to record location of module `{id}`: {error}");
                    }
                }
                Err(error) => {
                    log::warn!("Failed to read location of module `{id}`: {error}");
                }
            }
        }
        log::debug!("Delivering `{location}` from persistent store");
        Some(content)
    }

    fn store_content(&self, owner: Option<&ModuleId>, location: &str, content: &str) {
        if let Some(id) = owner {
            match self.store.get(&self.id_key(id)) {
                Ok(Some(previous)) if previous != location => {
                    log::debug!("Evicting stale `{previous}` cached for module `{id}`");
                    if let Err(error) = self.store.delete(&previous) {
                        log::warn!("Failed to evict `{previous}` from persistent store: {error}");
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    log::warn!("Failed to read location of module `{id}`: {error}");
                }
            }
        }
        if let Err(error) = self.store.put(location, content) {
            log::warn!("Failed to write `{location}` to persistent store: {error}");
            return;
        }
        if let Some(id) = owner {
            if let Err(error) = self.store.put(&self.id_key(id), location) {
                log::warn!("Failed to record location of module `{id}`: {error}");
            }
        }
    }
}
