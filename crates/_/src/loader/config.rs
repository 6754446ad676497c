use crate::error::LoaderError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Loader settings. Meant to be decided before anything gets loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// How long a network dispatch may take before it is reported as timed out.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Consult and fill the persistent store around network retrievals.
    pub cache_assisted: bool,
    /// Namespace of module id keys in the persistent store. Changing it once
    /// anything was cached leaves the old keys behind.
    pub cache_prefix: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            cache_assisted: true,
            cache_prefix: Default::default(),
        }
    }
}

impl LoaderConfig {
    pub fn from_json(content: &str) -> Result<Self, LoaderError> {
        serde_json::from_str(content).map_err(|error| LoaderError::Config(error.to_string()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_assisted(mut self, enabled: bool) -> Self {
        self.cache_assisted = enabled;
        self
    }

    pub fn with_cache_prefix(mut self, prefix: impl ToString) -> Self {
        self.cache_prefix = prefix.to_string();
        self
    }
}
