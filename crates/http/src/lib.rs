use loadstar::fetch::deferred::{DeferredTransport, DeferredTransportJob};
use reqwest::Url;
use std::error::Error;

pub mod third_party {
    pub use reqwest;
}

/// Transport performing HTTP requests on worker threads.
pub type HttpTransport = DeferredTransport<HttpTransportJob>;

/// Blocking HTTP GET of locations joined onto a root URL.
///
/// Locations that are absolute URLs replace the root entirely. Responses
/// with non-success status codes are reported as errors.
#[derive(Debug, Clone)]
pub struct HttpTransportJob {
    root: Url,
}

impl HttpTransportJob {
    pub fn new(root: &str) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            root: root.parse()?,
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn url(&self, location: &str) -> Result<Url, String> {
        self.root.join(location).map_err(|error| {
            format!(
                "Failed to join root URL: `{}` with location: `{}`. Error: {}",
                self.root, location, error
            )
        })
    }

    pub fn into_transport(self) -> HttpTransport {
        DeferredTransport::new(self)
    }
}

impl DeferredTransportJob for HttpTransportJob {
    fn retrieve(&self, location: &str) -> Result<String, String> {
        let url = self.url(location)?;
        let response = reqwest::blocking::get(url.clone()).map_err(|error| {
            format!(
                "Failed to get HTTP content from: `{}`. Error: {}",
                url, error
            )
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "HTTP request to: `{}` failed with status: {}",
                url, status
            ));
        }
        response.text().map_err(|error| {
            format!(
                "Failed to read text response from: `{}`. Error: {}",
                url, error
            )
        })
    }
}
