//! Module records.
//!
//! A [`Module`] is an immutable snapshot of one source file: its canonical
//! path, its raw source, and the declarations extracted from that source.
//! A changed file always produces a new record, never a mutated one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::{self, Declarations};

/// How a module participates in blanket ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Library module, eligible for blanket inclusion.
    Lib,
    /// Entry module, only included when explicitly requested.
    Entry,
    /// Third-party module, included only when reached via a require.
    Bundled,
}

/// Immutable record for one managed source file.
#[derive(Debug)]
pub struct Module {
    path: PathBuf,
    source: String,
    declarations: Declarations,
    role: Role,
}

impl Module {
    /// Load a module from disk.
    ///
    /// `path` is resolved against `cwd` and cleaned so the same file is
    /// never represented by two identities. Declarations are extracted once
    /// here; parse failures are reported with the module's resolved path.
    ///
    /// # Errors
    ///
    /// * [`crate::GraphError::Read`] when the file cannot be read.
    /// * [`crate::GraphError::ParseIn`] wrapping the extraction failure.
    pub async fn load(path: &Path, role: Role, cwd: &Path) -> Result<Arc<Self>> {
        let identity = canonical(path, cwd);
        let source = tokio::fs::read_to_string(&identity).await.map_err(|err| {
            crate::GraphError::Read {
                path: identity.clone(),
                source: err,
            }
        })?;
        Self::from_source(identity, source, role).map(Arc::new)
    }

    /// Construct a record from already-read source text.
    pub fn from_source(path: PathBuf, source: String, role: Role) -> Result<Self> {
        let declarations =
            extract::extract(&source).map_err(|err| err.in_module(path.clone()))?;
        tracing::debug!(
            path = %path.display(),
            provides = declarations.provides.len(),
            requires = declarations.requires.len(),
            "loaded module"
        );
        Ok(Self {
            path,
            source,
            declarations,
            role,
        })
    }

    /// Canonical absolute path; the module's unique key.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw source text at load time.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Namespaces declared by this module, in source order.
    pub fn provides(&self) -> &[String] {
        &self.declarations.provides
    }

    /// Namespaces this module depends on, in source order.
    pub fn requires(&self) -> &[String] {
        &self.declarations.requires
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// True for the module that bootstraps the root namespace.
    pub fn is_base(&self) -> bool {
        self.declarations.is_base
    }

    /// True when the module carries no graph information.
    pub fn has_no_declarations(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Resolve `path` against `cwd` into the canonical identity form.
pub fn canonical(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        cwd.join(path).clean()
    }
}
