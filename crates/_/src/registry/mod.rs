pub mod factory;

use crate::{
    error::LoaderError,
    id::ModuleId,
    registry::factory::{ExportsMap, ModuleFactory, is_empty_value},
};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

/// Shared exports of an instantiated module. Every request for the same
/// module yields a clone of the same `Arc`.
pub type Exports = Arc<Value>;

enum ModuleState {
    Defined(ModuleFactory),
    Instantiating,
    Ready(Exports),
    Failed(LoaderError),
}

/// Storage of module factories with memoized instantiation.
///
/// A factory runs at most once per registry: its outcome, exports or error,
/// is kept and handed out to every later request.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<ModuleId, ModuleState>,
    instantiating: Vec<ModuleId>,
}

impl ModuleRegistry {
    /// Stores factory for given module id, replacing a previous one that was
    /// not instantiated yet. Exports of an already instantiated module are
    /// never replaced.
    pub fn define(&mut self, id: impl Into<ModuleId>, factory: ModuleFactory) {
        let id = id.into();
        if let Some(ModuleState::Ready(_) | ModuleState::Instantiating) = self.modules.get(&id) {
            log::debug!("Module `{id}` is already instantiated, ignoring its new factory");
            return;
        }
        log::debug!("Defined module `{id}`");
        self.modules.insert(id, ModuleState::Defined(factory));
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn is_instantiated(&self, id: &str) -> bool {
        matches!(self.modules.get(id), Some(ModuleState::Ready(_)))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    /// Returns exports of a module, instantiating it on first request.
    ///
    /// This never triggers a fetch, the module has to be defined already.
    /// Callable factories get this registry to request their own
    /// dependencies, which instantiates them in call order.
    ///
    /// # Returns
    /// - Memoized exports of the module.
    /// - `ModuleNotFound` if no factory was defined for `id`.
    /// - `CyclicDependency` if `id` is requested while it is still being
    ///   instantiated.
    /// - `FactoryFailed` if the factory returned an error, now or before.
    pub fn request(&mut self, id: &str) -> Result<Exports, LoaderError> {
        let Some((key, state)) = self.modules.get_key_value(id) else {
            return Err(LoaderError::ModuleNotFound(id.into()));
        };
        let key = key.clone();
        match state {
            ModuleState::Ready(exports) => return Ok(exports.clone()),
            ModuleState::Failed(error) => return Err(error.clone()),
            ModuleState::Instantiating => {
                let start = self
                    .instantiating
                    .iter()
                    .position(|item| item == &key)
                    .unwrap_or_default();
                let mut chain = self.instantiating[start..].to_vec();
                chain.push(key.clone());
                return Err(LoaderError::CyclicDependency { id: key, chain });
            }
            ModuleState::Defined(_) => {}
        }
        let Some(ModuleState::Defined(factory)) =
            self.modules.insert(key.clone(), ModuleState::Instantiating)
        else {
            return Err(LoaderError::ModuleNotFound(key));
        };

        self.instantiating.push(key.clone());
        let result = self.instantiate(&key, factory);
        self.instantiating.pop();

        let state = match &result {
            Ok(exports) => ModuleState::Ready(exports.clone()),
            Err(error) => ModuleState::Failed(error.clone()),
        };
        self.modules.insert(key, state);
        result
    }

    fn instantiate(&mut self, id: &ModuleId, factory: ModuleFactory) -> Result<Exports, LoaderError> {
        match factory {
            ModuleFactory::Value(value) => Ok(Arc::new(value)),
            ModuleFactory::Callable(factory) => {
                let mut exports = ExportsMap::new();
                match factory(self, &mut exports) {
                    Ok(Some(value)) if !is_empty_value(&value) => Ok(Arc::new(value)),
                    Ok(_) => Ok(Arc::new(Value::Object(exports))),
                    Err(error) => Err(match error.downcast::<LoaderError>() {
                        Ok(error) => *error,
                        Err(error) => LoaderError::FactoryFailed {
                            id: id.clone(),
                            message: error.to_string(),
                        },
                    }),
                }
            }
        }
    }
}
