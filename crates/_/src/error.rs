use crate::id::ModuleId;
use std::time::Duration;
use thiserror::Error;

fn format_chain(chain: &[ModuleId]) -> String {
    chain
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors reported by the module loader.
///
/// Fetch related variants are reported once per failing module id through the
/// error callback of a resolution episode; the rest are returned directly from
/// synchronous calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Cannot find module `{0}`")]
    ModuleNotFound(ModuleId),

    #[error("Fetching module `{id}` from `{location}` timed out after {timeout:?}")]
    FetchTimeout {
        id: ModuleId,
        location: String,
        timeout: Duration,
    },

    #[error("An unknown error occurred while fetching module `{id}` from `{location}`: {message}")]
    UnknownTransport {
        id: ModuleId,
        location: String,
        message: String,
    },

    #[error("Executing `{location}` for module `{id}` failed: {message}")]
    Execution {
        id: ModuleId,
        location: String,
        message: String,
    },

    #[error("Module `{id}` was not defined by `{location}`")]
    NotDefined { id: ModuleId, location: String },

    #[error("Factory of module `{id}` failed: {message}")]
    FactoryFailed { id: ModuleId, message: String },

    #[error("Cyclic dependency while instantiating module `{id}`: {}", format_chain(.chain))]
    CyclicDependency { id: ModuleId, chain: Vec<ModuleId> },

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error("Invalid loader configuration: {0}")]
    Config(String),
}

impl LoaderError {
    /// Module id this error is about, if any.
    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            Self::ModuleNotFound(id) => Some(id),
            Self::FetchTimeout { id, .. }
            | Self::UnknownTransport { id, .. }
            | Self::Execution { id, .. }
            | Self::NotDefined { id, .. }
            | Self::FactoryFailed { id, .. }
            | Self::CyclicDependency { id, .. } => Some(id),
            Self::Catalog(_) | Self::Config(_) => None,
        }
    }

    /// Tells if this error comes from fetching or executing a resource.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout { .. }
                | Self::UnknownTransport { .. }
                | Self::Execution { .. }
                | Self::NotDefined { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let error = LoaderError::ModuleNotFound("a".into());
        assert_eq!(error.to_string(), "Cannot find module `a`");

        let error = LoaderError::CyclicDependency {
            id: "a".into(),
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            error.to_string(),
            "Cyclic dependency while instantiating module `a`: a -> b -> a"
        );
    }

    #[test]
    fn test_module_id() {
        let error = LoaderError::FetchTimeout {
            id: "b".into(),
            location: "b.js".to_owned(),
            timeout: Duration::from_millis(5000),
        };
        assert_eq!(error.module_id().map(|id| id.as_str()), Some("b"));
        assert!(error.is_fetch_failure());
        assert!(LoaderError::Catalog("oops".to_owned()).module_id().is_none());
    }
}
