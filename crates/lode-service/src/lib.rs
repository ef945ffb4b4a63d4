//! # lode-service
//!
//! The live side of lode: bulk discovery of managed files, a file watcher
//! that keeps the module set current, and the [`GraphService`] façade that
//! compiler invocations and dev servers query for load orders and module
//! sources.
//!
//! ```rust,no_run
//! use lode_service::{GraphService, ServiceConfig};
//!
//! # async fn run() -> Result<(), lode_service::ServiceError> {
//! let config = ServiceConfig::new("/project", vec!["lib/**/*.js".to_string()]);
//! let service = GraphService::start(config).await?;
//!
//! for path in service.ordered_paths(None)? {
//!     println!("{}", path.display());
//! }
//! service.stop();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
mod error;
pub mod events;
pub mod service;
pub mod watcher;

pub use config::{OnReloadError, ServiceConfig};
pub use error::{Result, ServiceError};
pub use events::ServiceEvent;
pub use service::GraphService;
pub use watcher::{FileChange, FileWatcher};

// Re-export the graph core so consumers need only one dependency.
pub use lode_graph::{GraphError, Module, Role};
