use crate::id::ModuleId;
use std::{error::Error, sync::mpsc::Sender};

/// Represents different kinds of events that can occur while loading modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderEventKind {
    /// Module got registered.
    Defined,
    /// Location was handed to the transport.
    Dispatched,
    /// Location content was delivered from the persistent store.
    CacheHit,
    /// Script content was delivered and executed.
    Delivered,
    /// Style content was delivered and attached.
    StyleAttached,
    FetchFailed,
    FetchTimedOut,
    /// Retrieval finished after its timeout was already reported.
    LateCompletionIgnored,
    /// Resolution episode completed with all requested exports.
    Resolved,
    ResolutionFailed,
}

impl LoaderEventKind {
    /// Checks if the event represents a failure.
    pub fn failure(self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::FetchTimedOut | Self::ResolutionFailed
        )
    }

    /// Checks if the event is about a location rather than a module.
    pub fn is_location_event(self) -> bool {
        matches!(
            self,
            Self::Dispatched
                | Self::CacheHit
                | Self::Delivered
                | Self::StyleAttached
                | Self::FetchFailed
                | Self::FetchTimedOut
                | Self::LateCompletionIgnored
        )
    }
}

/// Represents an event emitted by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderEvent {
    /// The kind of event that occurred.
    pub kind: LoaderEventKind,
    /// Module the event is about, if any.
    pub id: Option<ModuleId>,
    /// Location the event is about, if any.
    pub location: Option<String>,
}

/// A trait for listeners that handle loader events.
pub trait LoaderEventListener {
    /// Called when a loader event is dispatched.
    ///
    /// # Arguments
    /// - `event`: The loader event to handle.
    ///
    /// # Returns
    /// A `Result` indicating success or an error.
    fn on_dispatch(&mut self, event: LoaderEvent) -> Result<(), Box<dyn Error>>;
}

impl LoaderEventListener for Sender<LoaderEvent> {
    fn on_dispatch(&mut self, event: LoaderEvent) -> Result<(), Box<dyn Error>> {
        self.send(event)?;
        Ok(())
    }
}

impl<F> LoaderEventListener for F
where
    F: FnMut(LoaderEvent) -> Result<(), Box<dyn Error>>,
{
    fn on_dispatch(&mut self, event: LoaderEvent) -> Result<(), Box<dyn Error>> {
        self(event)
    }
}

/// A unique identifier for a loader event listener binding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoaderEventBinding(usize);

/// A manager for loader event listener bindings.
#[derive(Default)]
pub struct LoaderEventBindings {
    id_generator: usize,
    // [(binding, listener, dispatch once)]
    bindings: Vec<(LoaderEventBinding, Box<dyn LoaderEventListener>, bool)>,
}

impl LoaderEventBindings {
    /// Adds a new listener and returns its binding identifier.
    pub fn bind(&mut self, listener: impl LoaderEventListener + 'static) -> LoaderEventBinding {
        self.insert(listener, false)
    }

    /// Adds a new listener that is removed after being dispatched once.
    pub fn bind_once(&mut self, listener: impl LoaderEventListener + 'static) -> LoaderEventBinding {
        self.insert(listener, true)
    }

    /// Removes a listener by its binding identifier.
    ///
    /// # Returns
    /// The removed listener, if found.
    pub fn unbind(&mut self, binding: LoaderEventBinding) -> Option<Box<dyn LoaderEventListener>> {
        self.bindings
            .iter()
            .position(|(listener_binding, _, _)| *listener_binding == binding)
            .map(|index| self.bindings.swap_remove(index).1)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn bindings(&self) -> impl Iterator<Item = LoaderEventBinding> + '_ {
        self.bindings.iter().map(|(binding, _, _)| *binding)
    }

    /// Dispatches a loader event to all listeners.
    /// Listeners that were bound with `bind_once` are removed afterwards,
    /// even when some listener failed.
    ///
    /// # Returns
    /// The first listener error, if any.
    pub fn dispatch(&mut self, event: LoaderEvent) -> Result<(), Box<dyn Error>> {
        let mut result = Ok(());
        for (_, listener, _) in &mut self.bindings {
            if let Err(error) = listener.on_dispatch(event.clone()) {
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }
        self.bindings.retain(|(_, _, dispatch_once)| !*dispatch_once);
        result
    }

    fn insert(
        &mut self,
        listener: impl LoaderEventListener + 'static,
        dispatch_once: bool,
    ) -> LoaderEventBinding {
        let id = LoaderEventBinding(self.id_generator);
        self.id_generator = self.id_generator.overflowing_add(1).0;
        self.bindings.push((id, Box::new(listener), dispatch_once));
        id
    }
}
