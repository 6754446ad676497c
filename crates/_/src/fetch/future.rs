use crate::fetch::{Transport, TransportFuture};
use std::error::Error;

/// A future-based transport that hands every retrieval to a user-defined
/// future spawner.
///
/// The main reason for this transport to exist is to allow the use of
/// async/await syntax for retrieval, and especially to allow third party
/// runtimes such as `tokio` to do the actual I/O. Futures are polled with a
/// no-op waker, so they should await work that progresses on its own, like
/// a task spawned on a runtime.
pub struct FutureTransport {
    #[allow(clippy::type_complexity)]
    future_spawner: Box<dyn FnMut(String) -> TransportFuture>,
}

impl FutureTransport {
    /// Creates a new `FutureTransport` with a specified future spawner function.
    ///
    /// # Arguments
    /// - `future_spawner`: A function that takes a location and returns a
    ///   future that resolves to its content or an error.
    ///
    /// # Returns
    /// - A new `FutureTransport` instance.
    pub fn new<Fut>(mut future_spawner: impl FnMut(String) -> Fut + 'static) -> Self
    where
        Fut: Future<Output = Result<String, Box<dyn Error>>> + 'static,
    {
        Self {
            future_spawner: Box::new(move |location| Box::pin(future_spawner(location))),
        }
    }
}

impl Transport for FutureTransport {
    fn retrieve(&mut self, location: &str) -> TransportFuture {
        (self.future_spawner)(location.to_owned())
    }
}
