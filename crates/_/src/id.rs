use serde::{Deserialize, Serialize};
use std::{
    borrow::{Borrow, Cow},
    ops::Deref,
};

/// Opaque identifier of a loadable module.
///
/// Hashes and compares exactly like the string it wraps, so maps keyed by
/// `ModuleId` can be queried with plain `&str`.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(Cow<'static, str>);

impl ModuleId {
    pub fn new(content: impl Into<Cow<'static, str>>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(Cow::Owned(format!("{}{}", self.0, suffix)))
    }
}

impl Deref for ModuleId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_owned()))
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl From<&String> for ModuleId {
    fn from(value: &String) -> Self {
        Self(Cow::Owned(value.clone()))
    }
}

impl From<&ModuleId> for ModuleId {
    fn from(value: &ModuleId) -> Self {
        value.clone()
    }
}

impl From<Cow<'static, str>> for ModuleId {
    fn from(value: Cow<'static, str>) -> Self {
        Self(value)
    }
}
