//! # Loadstar - Dependency-Aware Module Loading for Rust
//! **A small runtime that fetches, registers and instantiates named modules on demand**
//!
//! Modules are described in a resource catalog (location, declared dependencies
//! and optional package), fetched through a pluggable transport, executed by a
//! pluggable environment that defines them, and instantiated lazily with their
//! exports memoized. Resolution waits only for *registration* of every module a
//! request transitively depends on, then hands exports back in requested order.
//!
//! ### Key Features:
//! - **Exactly-once fetches**: every location is dispatched at most once, all
//!   modules waiting for it share the outcome.
//! - **Cache-assisted delivery**: retrieved content is kept in a persistent store
//!   and stale entries are evicted when a module moves to another location.
//! - **Timeout watchdog**: slow retrievals are reported as timed out and their late
//!   results ignored.
//! - **Pluggable transports**: in-memory, file system, worker-thread jobs and async
//!   functions driven by any runtime.
//! - **Events**: listeners observe definitions, dispatches, deliveries and failures.
//!
//! ### Example Usage:
//! ```rust
//! use loadstar::{
//!     catalog::{CatalogConfig, ResourceDescriptor},
//!     environment::json::JsonModuleEnvironment,
//!     fetch::memory::MemoryTransport,
//!     loader::ModuleLoader,
//! };
//! use std::{cell::RefCell, rc::Rc};
//!
//! let transport = MemoryTransport::default()
//!     .with("a.js", r#"{ "a": { "name": "a" } }"#)
//!     .with("b.js", r#"{ "b": { "name": "b" } }"#);
//! let mut loader = ModuleLoader::new(transport, JsonModuleEnvironment::default())
//!     .with_catalog(
//!         CatalogConfig::default()
//!             .resource("a", ResourceDescriptor::new("a.js").dependency("b"))
//!             .resource("b", ResourceDescriptor::new("b.js")),
//!     );
//!
//! let result = Rc::new(RefCell::new(None));
//! let output = result.clone();
//! loader.resolve(
//!     ["b", "a"],
//!     move |_, exports| *output.borrow_mut() = Some(exports),
//!     |_, error| panic!("{error}"),
//! );
//! while loader.is_busy() {
//!     loader.maintain();
//! }
//!
//! let exports = result.borrow_mut().take().unwrap();
//! assert_eq!(exports[0]["name"], "b");
//! assert_eq!(exports[1]["name"], "a");
//! ```

pub mod catalog;
pub mod environment;
pub mod error;
pub mod fetch;
pub mod id;
pub mod loader;
pub mod registry;
pub mod store;

pub use crate::{
    error::LoaderError,
    id::ModuleId,
    loader::{ModuleLoader, config::LoaderConfig},
    registry::{Exports, factory::ModuleFactory},
};

pub mod third_party {
    pub use serde_json;
}
