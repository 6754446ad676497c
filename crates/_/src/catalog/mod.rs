#[cfg(feature = "hotreload")]
pub mod hotreload;

use crate::{error::LoaderError, id::ModuleId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of resource a location points to, decided by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Executable code that is expected to define modules.
    Script,
    /// Style sheet. Attaching it is terminal, it never defines modules.
    Style,
}

impl ResourceKind {
    pub fn from_location(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.ends_with(".css") {
            Self::Style
        } else {
            Self::Script
        }
    }
}

/// Catalog entry describing where a module lives and what it depends on.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    #[serde(
        default,
        rename = "url",
        alias = "location",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<ModuleId>,
    #[serde(
        default,
        rename = "pkg",
        alias = "package",
        skip_serializing_if = "Option::is_none"
    )]
    pub package: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(location: impl ToString) -> Self {
        Self {
            location: Some(location.to_string()),
            ..Default::default()
        }
    }

    pub fn in_package(package: impl ToString) -> Self {
        Self {
            package: Some(package.to_string()),
            ..Default::default()
        }
    }

    pub fn dependency(mut self, id: impl Into<ModuleId>) -> Self {
        self.deps.push(id.into());
        self
    }

    pub fn dependencies(mut self, ids: impl IntoIterator<Item = impl Into<ModuleId>>) -> Self {
        self.deps.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn package(mut self, package: impl ToString) -> Self {
        self.package = Some(package.to_string());
        self
    }
}

/// Catalog entry grouping several modules behind one fetched location.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    #[serde(rename = "url", alias = "location")]
    pub location: String,
}

impl PackageDescriptor {
    pub fn new(location: impl ToString) -> Self {
        Self {
            location: location.to_string(),
        }
    }
}

/// Tables merged into a [`ResourceCatalog`].
///
/// Both tables are optional when deserialized, and the short `res`/`pkg`
/// table names produced by common bundlers are accepted as aliases.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default, alias = "res")]
    pub resources: HashMap<ModuleId, ResourceDescriptor>,
    #[serde(default, alias = "pkg")]
    pub packages: HashMap<String, PackageDescriptor>,
}

impl CatalogConfig {
    pub fn from_json(content: &str) -> Result<Self, LoaderError> {
        serde_json::from_str(content).map_err(|error| LoaderError::Catalog(error.to_string()))
    }

    pub fn resource(mut self, id: impl Into<ModuleId>, descriptor: ResourceDescriptor) -> Self {
        self.resources.insert(id.into(), descriptor);
        self
    }

    pub fn package(mut self, id: impl ToString, descriptor: PackageDescriptor) -> Self {
        self.packages.insert(id.to_string(), descriptor);
        self
    }
}

/// Static description of every known module: its location, its declared
/// dependencies and the package it may be bundled into.
///
/// Lookups are total. An id missing from the catalog is its own location and
/// has no dependencies.
#[derive(Debug, Default, Clone)]
pub struct ResourceCatalog {
    resources: HashMap<ModuleId, ResourceDescriptor>,
    packages: HashMap<String, PackageDescriptor>,
}

impl ResourceCatalog {
    /// Unions given tables into the catalog. Entries with an already known id
    /// replace the previous ones.
    pub fn merge(&mut self, config: CatalogConfig) {
        log::info!(
            "Merging {} resource(s) and {} package(s) into catalog",
            config.resources.len(),
            config.packages.len()
        );
        self.resources.extend(config.resources);
        self.packages.extend(config.packages);
    }

    pub fn merge_json(&mut self, content: &str) -> Result<(), LoaderError> {
        self.merge(CatalogConfig::from_json(content)?);
        Ok(())
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(id)
    }

    pub fn package(&self, id: &str) -> Option<&PackageDescriptor> {
        self.packages.get(id)
    }

    pub fn resolve_location(&self, id: &str) -> String {
        let Some(descriptor) = self.resources.get(id) else {
            return id.to_owned();
        };
        if let Some(location) = descriptor.location.as_ref() {
            return location.clone();
        }
        descriptor
            .package
            .as_deref()
            .and_then(|package| self.packages.get(package))
            .map(|package| package.location.clone())
            .unwrap_or_else(|| id.to_owned())
    }

    /// Dependencies declared for `id`. Ids written without their `.js`
    /// extension fall back to the descriptor registered with it.
    pub fn declared_dependencies(&self, id: &str) -> &[ModuleId] {
        self.resources
            .get(id)
            .or_else(|| {
                self.resources
                    .get(ModuleId::from(id).with_suffix(".js").as_str())
            })
            .map(|descriptor| descriptor.deps.as_slice())
            .unwrap_or_default()
    }

    pub fn resource_kind(&self, id: &str) -> ResourceKind {
        ResourceKind::from_location(&self.resolve_location(id))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.resources.keys()
    }
}
