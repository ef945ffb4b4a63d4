//! # lode-graph
//!
//! Dependency graph primitives for `goog.provide` / `goog.require` style
//! modules: declaration extraction, immutable module records, and
//! deterministic load-order resolution.
//!
//! The crate is pure computation apart from [`Module::load`], which reads a
//! single file. Watching, discovery, and the service façade live in
//! `lode-service`.
//!
//! ## Quick start
//!
//! ```rust
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use lode_graph::{Module, ModuleSet, Role, order};
//!
//! # fn main() -> Result<(), lode_graph::GraphError> {
//! let mut modules = ModuleSet::new();
//! for (path, source) in [
//!     ("/lib/base.js", "var goog = goog || {};"),
//!     ("/lib/fruit.js", "goog.provide('fruit');\ngoog.require('goog');"),
//! ] {
//!     let module = Module::from_source(PathBuf::from(path), source.to_string(), Role::Lib)?;
//!     modules.insert(module.path().to_path_buf(), Arc::new(module));
//! }
//!
//! let ordering = order(&modules, None)?;
//! assert_eq!(ordering.len(), 2);
//! assert!(ordering[0].is_base());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod extract;
pub mod module;
pub mod resolver;

pub use error::{GraphError, Result};
pub use extract::{BASE_NAMESPACE, Declarations, extract};
pub use module::{Module, Role, canonical};
pub use resolver::{ModuleSet, order};
