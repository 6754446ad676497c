use crate::registry::ModuleRegistry;
use serde_json::{Map, Value};
use std::error::Error;

/// Mutable exports container handed to callable factories.
pub type ExportsMap = Map<String, Value>;

pub type FactoryFn =
    dyn FnOnce(&mut ModuleRegistry, &mut ExportsMap) -> Result<Option<Value>, Box<dyn Error>>;

/// Implementation of a module, decided once at definition time.
pub enum ModuleFactory {
    /// Called once on first request with the registry (to request further
    /// modules) and an empty exports map. A returned value that is not empty
    /// supersedes the map.
    Callable(Box<FactoryFn>),
    /// Used directly as exports.
    Value(Value),
}

impl ModuleFactory {
    pub fn callable(
        factory: impl FnOnce(&mut ModuleRegistry, &mut ExportsMap) -> Result<Option<Value>, Box<dyn Error>>
        + 'static,
    ) -> Self {
        Self::Callable(Box::new(factory))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_))
    }
}

impl From<Value> for ModuleFactory {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl std::fmt::Debug for ModuleFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

// Falsy values do not replace the exports map.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(value) => !value,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
