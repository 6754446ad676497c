use crate::{
    catalog::ResourceKind,
    error::LoaderError,
    id::ModuleId,
    loader::{ModuleLoader, events::LoaderEventKind},
    registry::Exports,
};
use serde_json::Value;
use std::{cell::RefCell, collections::HashSet, rc::Rc, sync::Arc};

/// Single module id or a list of them.
pub trait IntoModuleIds {
    fn into_module_ids(self) -> Vec<ModuleId>;
}

impl IntoModuleIds for &str {
    fn into_module_ids(self) -> Vec<ModuleId> {
        vec![self.into()]
    }
}

impl IntoModuleIds for String {
    fn into_module_ids(self) -> Vec<ModuleId> {
        vec![self.into()]
    }
}

impl IntoModuleIds for ModuleId {
    fn into_module_ids(self) -> Vec<ModuleId> {
        vec![self]
    }
}

impl<T: Into<ModuleId>> IntoModuleIds for Vec<T> {
    fn into_module_ids(self) -> Vec<ModuleId> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<ModuleId>, const N: usize> IntoModuleIds for [T; N] {
    fn into_module_ids(self) -> Vec<ModuleId> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<ModuleId> + Clone> IntoModuleIds for &[T] {
    fn into_module_ids(self) -> Vec<ModuleId> {
        self.iter().cloned().map(Into::into).collect()
    }
}

type CompleteCallback = Box<dyn FnOnce(&mut ModuleLoader, Vec<Exports>)>;
type ErrorCallback = Box<dyn FnOnce(&mut ModuleLoader, LoaderError)>;

/// State shared by every continuation one `resolve` call scheduled.
struct ResolutionEpisode {
    requested: Vec<ModuleId>,
    // Starts at 1 for the traversal itself, so completions arriving while the
    // worklist is still being walked cannot finish the episode early.
    pending: usize,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl ResolutionEpisode {
    fn is_settled(&self) -> bool {
        self.on_error.is_none()
    }
}

fn release(episode: &Rc<RefCell<ResolutionEpisode>>, loader: &mut ModuleLoader) {
    let on_complete = {
        let mut episode = episode.borrow_mut();
        episode.pending = episode.pending.saturating_sub(1);
        if episode.pending > 0 || episode.is_settled() {
            return;
        }
        episode.on_complete.take()
    };
    let Some(on_complete) = on_complete else {
        return;
    };
    let requested = std::mem::take(&mut episode.borrow_mut().requested);
    let exports = requested
        .iter()
        .map(|id| exports_of(loader, id))
        .collect::<Result<Vec<_>, _>>();
    match exports {
        Ok(exports) => {
            episode.borrow_mut().on_error = None;
            loader.emit(LoaderEventKind::Resolved, requested.first(), None);
            on_complete(loader, exports);
        }
        Err(error) => fail(episode, loader, error),
    }
}

fn fail(episode: &Rc<RefCell<ResolutionEpisode>>, loader: &mut ModuleLoader, error: LoaderError) {
    let on_error = {
        let mut episode = episode.borrow_mut();
        episode.on_complete = None;
        episode.on_error.take()
    };
    if let Some(on_error) = on_error {
        log::debug!("Resolution failed: {error}");
        loader.emit(LoaderEventKind::ResolutionFailed, error.module_id(), None);
        on_error(loader, error);
    }
}

fn exports_of(loader: &mut ModuleLoader, id: &ModuleId) -> Result<Exports, LoaderError> {
    if !loader.registry.is_defined(id) && loader.catalog.resource_kind(id) == ResourceKind::Style {
        return Ok(Arc::new(Value::Null));
    }
    loader.request(id)
}

impl ModuleLoader {
    /// Makes sure requested modules and everything they transitively declare
    /// as dependencies are registered, then hands over exports of requested
    /// modules in the order they were requested.
    ///
    /// Registration is all that gets awaited: instantiation happens at the
    /// end through [`ModuleLoader::request`], which walks dependencies among
    /// registered modules on its own.
    ///
    /// # Arguments
    /// - `ids`: Single id or a list of ids to resolve.
    /// - `on_complete`: Called once with exports of requested modules. Never
    ///   called after `on_error`.
    /// - `on_error`: Called at most once, with the first failure reported for
    ///   any module this episode waits for.
    pub fn resolve(
        &mut self,
        ids: impl IntoModuleIds,
        on_complete: impl FnOnce(&mut ModuleLoader, Vec<Exports>) + 'static,
        on_error: impl FnOnce(&mut ModuleLoader, LoaderError) + 'static,
    ) {
        let requested = ids.into_module_ids();
        let episode = Rc::new(RefCell::new(ResolutionEpisode {
            requested: requested.clone(),
            pending: 1,
            on_complete: Some(Box::new(on_complete)),
            on_error: Some(Box::new(on_error)),
        }));

        let mut visited = HashSet::new();
        let mut worklist = requested.into_iter().rev().collect::<Vec<_>>();
        while let Some(id) = worklist.pop() {
            if episode.borrow().is_settled() {
                return;
            }
            if !visited.insert(id.clone()) {
                continue;
            }
            if !self.registry.is_defined(&id) {
                episode.borrow_mut().pending += 1;
                let episode = episode.clone();
                self.wait(
                    id.clone(),
                    Box::new(move |loader, result| match result {
                        Ok(()) => release(&episode, loader),
                        Err(error) => fail(&episode, loader, error),
                    }),
                );
            }
            worklist.extend(
                self.catalog
                    .declared_dependencies(&id)
                    .iter()
                    .rev()
                    .filter(|dependency| !visited.contains(*dependency))
                    .cloned(),
            );
        }
        release(&episode, self);
    }
}
