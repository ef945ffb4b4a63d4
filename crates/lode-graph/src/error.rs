//! Error types for graph construction and resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading modules or resolving load order.
///
/// Construction-time errors (`Parse`, `Read`) fail a single file's load.
/// Graph-level errors are detected at resolution time and fail only the
/// resolution call that raised them.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Source text could not be parsed at all.
    #[error("parse error at line {line}, column {column}: {message} ({text})")]
    Parse {
        line: u32,
        column: u32,
        /// The offending source line, trimmed.
        text: String,
        message: String,
    },

    /// A parse failure tied to the module it came from.
    #[error("in module {path}: {source}", path = .path.display())]
    ParseIn {
        path: PathBuf,
        #[source]
        source: Box<GraphError>,
    },

    /// The base module also declares explicit provides.
    #[error("base module must not contain explicit provide statements")]
    InvalidBaseModule,

    /// A module file could not be read.
    #[error("failed to read {path}", path = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A namespace is declared by two modules in the active set.
    #[error(
        "redundant provide \"{namespace}\" in {second} - already provided by {first}",
        first = .first.display(),
        second = .second.display()
    )]
    DuplicateProvide {
        namespace: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// No module in the set establishes the root namespace.
    #[error("no base module in the module set")]
    MissingBase,

    /// More than one module establishes the root namespace.
    #[error(
        "multiple base modules: {first} and {second}",
        first = .first.display(),
        second = .second.display()
    )]
    MultipleBases { first: PathBuf, second: PathBuf },

    /// A required namespace has no owner.
    #[error(
        "unsatisfied dependency \"{namespace}\" in module {module}",
        module = .module.display()
    )]
    UnsatisfiedRequire { namespace: String, module: PathBuf },

    /// A require chain loops back into a module still being visited.
    #[error(
        "circular dependency on \"{namespace}\" via module {module}",
        module = .module.display()
    )]
    CyclicRequire { namespace: String, module: PathBuf },

    /// The requested entry point is not part of the module set.
    #[error("unknown entry point: {}", .0.display())]
    UnknownEntryPoint(PathBuf),
}

impl GraphError {
    /// Attach the owning module's path to a construction-time error.
    pub fn in_module(self, path: PathBuf) -> Self {
        match self {
            GraphError::Parse { .. } | GraphError::InvalidBaseModule => GraphError::ParseIn {
                path,
                source: Box::new(self),
            },
            other => other,
        }
    }
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
