//! Dependency injection with validated binding graphs.
//!
//! Bindings are declared by [`InjectorConfiguration`] implementations
//! and addressed by a [`BindingKey`]: a meta-type (value, unique,
//! reference, shared), the target type, and an instance name.
//! [`Injector::create`] builds the binding map, validates the full
//! dependency graph (duplicates, missing dependencies, cycles),
//! instantiates eager singletons in dependency order, and runs
//! post-construction callbacks. Nothing about the graph is checked
//! lazily: a constructed injector cannot hit a wiring error at
//! resolution time, only a deliberate [`InjectorError::NoBinding`] for
//! keys that were never declared.
//!
//! Injectors form hierarchies: a child resolves locally first and then
//! delegates up the parent chain. Prototype children share an already
//! validated binding map, singletons included.
//!
//! ```
//! use bindery::{Binder, BindingKey, Injectable, Injector, InjectorConfiguration, InjectorError};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! impl Injectable for Database {
//!     fn dependencies() -> Vec<BindingKey> {
//!         vec![BindingKey::value::<String>("db.url")]
//!     }
//!
//!     fn construct(injector: &Injector) -> Result<Self, InjectorError> {
//!         Ok(Database { url: injector.get_value("db.url")? })
//!     }
//! }
//!
//! struct AppConfig;
//!
//! impl InjectorConfiguration for AppConfig {
//!     fn configure(&self, binder: &mut Binder) {
//!         binder.bind::<String>("db.url").to_prototype("postgres://localhost".into());
//!         binder.bind::<Database>("").to_singleton();
//!     }
//! }
//!
//! let injector = Injector::create(&[&AppConfig]).unwrap();
//! let database: Arc<Database> = injector.get_shared("").unwrap();
//! assert_eq!(database.url, "postgres://localhost");
//! ```

mod binding;
mod binding_map;
mod config;
mod errors;
mod graph;
mod injectable;
mod injector;
mod key;

pub use config::{Binder, BindingBuilder, InjectorConfiguration};
pub use errors::InjectorError;
pub use graph::{BindingGraph, CycleEdges};
pub use injectable::Injectable;
pub use injector::{Injector, Validation};
pub use key::{BindingKey, BindingKeyView, BindingMetaType};
