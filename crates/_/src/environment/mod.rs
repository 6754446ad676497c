pub mod json;

use crate::{id::ModuleId, registry::factory::ModuleFactory};
use std::error::Error;

/// Collects module definitions made while a script executes.
///
/// Definitions are applied to the loader only after the script finished, so
/// every module bundled in one location is registered before any waiter for
/// them gets notified.
#[derive(Debug, Default)]
pub struct ModuleDefiner {
    definitions: Vec<(ModuleId, ModuleFactory)>,
}

impl ModuleDefiner {
    pub fn define(&mut self, id: impl Into<ModuleId>, factory: impl Into<ModuleFactory>) {
        self.definitions.push((id.into(), factory.into()));
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.definitions.iter().map(|(id, _)| id)
    }

    pub(crate) fn into_definitions(self) -> Vec<(ModuleId, ModuleFactory)> {
        self.definitions
    }
}

/// Execution environment that runs delivered resources.
///
/// Scripts are expected to define modules as a side effect of running;
/// styles are only attached and never define anything.
pub trait ModuleEnvironment {
    /// Runs script content fetched from `location`.
    ///
    /// # Arguments
    /// - `location`: Where the content was fetched from.
    /// - `content`: Raw script text.
    /// - `definer`: Sink for the modules this script defines.
    ///
    /// # Returns
    /// - `Ok(())` when the script ran, an error when it failed to.
    fn execute_script(
        &mut self,
        location: &str,
        content: &str,
        definer: &mut ModuleDefiner,
    ) -> Result<(), Box<dyn Error>>;

    /// Attaches style sheet content fetched from `location`.
    ///
    /// # Default Implementation
    /// Does nothing and returns `Ok(())`.
    #[allow(unused_variables)]
    fn attach_style(&mut self, location: &str, content: &str) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

impl<F> ModuleEnvironment for F
where
    F: FnMut(&str, &str, &mut ModuleDefiner) -> Result<(), Box<dyn Error>>,
{
    fn execute_script(
        &mut self,
        location: &str,
        content: &str,
        definer: &mut ModuleDefiner,
    ) -> Result<(), Box<dyn Error>> {
        self(location, content, definer)
    }
}
