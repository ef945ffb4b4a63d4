//! Service configuration.
//!
//! The embedding application constructs a [`ServiceConfig`] in code (or
//! deserializes one); config-file discovery is out of scope here. Patterns
//! are glob-style and resolved relative to `cwd`.

use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};
use lode_graph::Role;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// What to do when reloading a changed file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnReloadError {
    /// Keep the previous consistent record for the path and report the
    /// failure to subscribers.
    #[default]
    KeepPrevious,
    /// Remove the stale record so the failure is visible in resolution.
    Drop,
}

/// Configuration for a [`crate::GraphService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Working directory patterns are resolved against.
    pub cwd: PathBuf,
    /// Library modules, eligible for blanket ordering.
    pub lib: Vec<String>,
    /// Entry modules, only ordered when explicitly requested.
    #[serde(default)]
    pub main: Vec<String>,
    /// Third-party modules, included only via explicit requires.
    #[serde(default)]
    pub bundle: Vec<String>,
    /// Reload failure policy for watched files.
    #[serde(default)]
    pub on_reload_error: OnReloadError,
    /// Debounce window for duplicate watch events on the same path.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    50
}

impl ServiceConfig {
    /// A library-only configuration.
    pub fn new(cwd: impl Into<PathBuf>, lib: Vec<String>) -> Self {
        Self {
            cwd: cwd.into(),
            lib,
            main: Vec::new(),
            bundle: Vec::new(),
            on_reload_error: OnReloadError::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Compiled glob sets, one per module role.
///
/// Entry patterns are checked before bundle and library patterns so a file
/// matched by both a `main` glob and a broad `lib` glob is still an entry.
#[derive(Clone)]
pub struct PatternSets {
    lib: Override,
    main: Override,
    bundle: Override,
}

impl PatternSets {
    /// Compile the configured patterns against the working directory.
    pub fn compile(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            lib: build_set(&config.cwd, &config.lib)?,
            main: build_set(&config.cwd, &config.main)?,
            bundle: build_set(&config.cwd, &config.bundle)?,
        })
    }

    /// Determine the role of a file path, or `None` when no set matches.
    pub fn classify(&self, path: &Path) -> Option<Role> {
        if self.main.matched(path, false).is_whitelist() {
            Some(Role::Entry)
        } else if self.bundle.matched(path, false).is_whitelist() {
            Some(Role::Bundled)
        } else if self.lib.matched(path, false).is_whitelist() {
            Some(Role::Lib)
        } else {
            None
        }
    }
}

fn build_set(cwd: &Path, patterns: &[String]) -> Result<Override> {
    let mut builder = OverrideBuilder::new(cwd);
    for pattern in patterns {
        builder
            .add(pattern)
            .map_err(|source| ServiceError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
    }
    builder.build().map_err(ServiceError::Walk)
}
