use crate::fetch::{Transport, TransportFuture};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

type Slot = Rc<RefCell<Option<Result<String, String>>>>;

#[derive(Default)]
struct MemoryTransportState {
    contents: HashMap<String, String>,
    held: HashSet<String>,
    slots: HashMap<String, Vec<Slot>>,
    dispatches: HashMap<String, usize>,
}

struct MemoryRetrieval {
    slot: Slot,
}

impl Future for MemoryRetrieval {
    type Output = Result<String, Box<dyn std::error::Error>>;

    fn poll(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        match self.slot.borrow_mut().take() {
            Some(result) => Poll::Ready(result.map_err(Into::into)),
            None => Poll::Pending,
        }
    }
}

/// Transport serving locations from an in-memory map.
///
/// Locations can be held back so their retrievals stay pending until released,
/// completed or failed by hand. Clones share the same state, which lets a
/// clone outside the loader drive retrievals and count dispatches.
#[derive(Default, Clone)]
pub struct MemoryTransport {
    state: Rc<RefCell<MemoryTransportState>>,
}

impl MemoryTransport {
    pub fn with(self, location: impl ToString, content: impl ToString) -> Self {
        self.insert(location, content);
        self
    }

    pub fn insert(&self, location: impl ToString, content: impl ToString) {
        self.state
            .borrow_mut()
            .contents
            .insert(location.to_string(), content.to_string());
    }

    /// Keeps future retrievals of `location` pending until it is released.
    pub fn hold(&self, location: impl ToString) {
        self.state.borrow_mut().held.insert(location.to_string());
    }

    /// Stops holding `location` and resolves its pending retrievals with
    /// the stored content.
    pub fn release(&self, location: &str) {
        let result = {
            let mut state = self.state.borrow_mut();
            state.held.remove(location);
            state
                .contents
                .get(location)
                .cloned()
                .ok_or_else(|| format!("Location `{location}` not found"))
        };
        self.resolve(location, result);
    }

    /// Resolves pending retrievals of `location` with given content.
    pub fn complete(&self, location: &str, content: impl ToString) {
        self.resolve(location, Ok(content.to_string()));
    }

    /// Resolves pending retrievals of `location` with an error.
    pub fn fail(&self, location: &str, message: impl ToString) {
        self.resolve(location, Err(message.to_string()));
    }

    pub fn dispatch_count(&self, location: &str) -> usize {
        self.state
            .borrow()
            .dispatches
            .get(location)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_dispatches(&self) -> usize {
        self.state.borrow().dispatches.values().sum()
    }

    fn resolve(&self, location: &str, result: Result<String, String>) {
        let slots = self
            .state
            .borrow_mut()
            .slots
            .remove(location)
            .unwrap_or_default();
        for slot in slots {
            *slot.borrow_mut() = Some(result.clone());
        }
    }
}

impl Transport for MemoryTransport {
    fn retrieve(&mut self, location: &str) -> TransportFuture {
        let mut state = self.state.borrow_mut();
        *state.dispatches.entry(location.to_owned()).or_default() += 1;
        let slot = Slot::default();
        if state.held.contains(location) {
            state
                .slots
                .entry(location.to_owned())
                .or_default()
                .push(slot.clone());
        } else {
            *slot.borrow_mut() = Some(
                state
                    .contents
                    .get(location)
                    .cloned()
                    .ok_or_else(|| format!("Location `{location}` not found")),
            );
        }
        Box::pin(MemoryRetrieval { slot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Waker;

    fn poll(future: &mut TransportFuture) -> Option<Result<String, String>> {
        let mut cx = Context::from_waker(Waker::noop());
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(result) => Some(result.map_err(|error| error.to_string())),
            Poll::Pending => None,
        }
    }

    #[test]
    fn test_immediate_retrieval() {
        let mut transport = MemoryTransport::default().with("a.js", "{}");
        assert_eq!(poll(&mut transport.retrieve("a.js")), Some(Ok("{}".to_owned())));
        assert!(matches!(poll(&mut transport.retrieve("b.js")), Some(Err(_))));
        assert_eq!(transport.dispatch_count("a.js"), 1);
        assert_eq!(transport.total_dispatches(), 2);
    }

    #[test]
    fn test_held_retrieval() {
        let mut transport = MemoryTransport::default().with("a.js", "{}");
        transport.hold("a.js");
        let mut future = transport.retrieve("a.js");
        assert_eq!(poll(&mut future), None);
        transport.release("a.js");
        assert_eq!(poll(&mut future), Some(Ok("{}".to_owned())));

        transport.hold("b.js");
        let mut future = transport.retrieve("b.js");
        transport.fail("b.js", "offline");
        assert_eq!(poll(&mut future), Some(Err("offline".to_owned())));
    }
}
