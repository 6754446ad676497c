use crate::fetch::{Transport, TransportFuture};
use std::{
    error::Error,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    thread::{JoinHandle, spawn},
};

/// Blocking retrieval executed on a worker thread.
pub trait DeferredTransportJob: Send + Sync + 'static {
    fn retrieve(&self, location: &str) -> Result<String, String>;
}

impl<F> DeferredTransportJob for F
where
    F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
{
    fn retrieve(&self, location: &str) -> Result<String, String> {
        self(location)
    }
}

struct DeferredRetrieval {
    location: String,
    handle: Option<JoinHandle<Result<String, String>>>,
}

impl Future for DeferredRetrieval {
    type Output = Result<String, Box<dyn Error>>;

    fn poll(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        if !self
            .handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
        {
            return Poll::Pending;
        }
        let Some(handle) = self.handle.take() else {
            return Poll::Ready(Err(format!(
                "Job of `{}` location was already consumed",
                self.location
            )
            .into()));
        };
        let result = match handle.join() {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(format!("Error during job execution of `{}` location!", self.location).into()),
        };
        Poll::Ready(result)
    }
}

/// Transport running every retrieval as a job on its own thread, so slow
/// blocking I/O never stalls the loader.
pub struct DeferredTransport<Job: DeferredTransportJob> {
    job: Arc<Job>,
}

impl<Job: DeferredTransportJob> DeferredTransport<Job> {
    pub fn new(job: Job) -> Self {
        Self { job: Arc::new(job) }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }
}

impl<Job: DeferredTransportJob> Transport for DeferredTransport<Job> {
    fn retrieve(&mut self, location: &str) -> TransportFuture {
        let job = self.job.clone();
        let path = location.to_owned();
        Box::pin(DeferredRetrieval {
            location: location.to_owned(),
            handle: Some(spawn(move || job.retrieve(&path))),
        })
    }
}
