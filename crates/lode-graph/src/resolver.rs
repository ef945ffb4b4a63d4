//! Deterministic load-order resolution.
//!
//! Builds a namespace index over the active module set and walks requires
//! depth-first, emitting each module after everything it requires. The
//! module set is kept in a `BTreeMap` so the seed order (and therefore the
//! result) is stable for a fixed set of files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{GraphError, Result};
use crate::extract::BASE_NAMESPACE;
use crate::module::{Module, Role};

/// The active module set, keyed by canonical path.
///
/// Enumeration order is sorted-path order, which fixes the DFS seed order.
pub type ModuleSet = BTreeMap<PathBuf, Arc<Module>>;

/// Namespace ownership index for one resolution pass.
struct ProvideIndex<'a> {
    owners: FxHashMap<&'a str, &'a Arc<Module>>,
}

impl<'a> ProvideIndex<'a> {
    /// Index every provided namespace, rejecting duplicate ownership.
    fn build(modules: &'a ModuleSet) -> Result<Self> {
        let mut owners: FxHashMap<&str, &Arc<Module>> = FxHashMap::default();
        for module in modules.values() {
            for namespace in module.provides() {
                if let Some(first) = owners.insert(namespace, module) {
                    return Err(GraphError::DuplicateProvide {
                        namespace: namespace.clone(),
                        first: first.path().to_path_buf(),
                        second: module.path().to_path_buf(),
                    });
                }
            }
        }
        Ok(Self { owners })
    }

    fn owner(&self, namespace: &str) -> Option<&'a Arc<Module>> {
        self.owners.get(namespace).copied()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Compute the load order for `modules`.
///
/// The base module is always emitted first. With an `entry` path, only that
/// module's transitive require closure is emitted; otherwise every library
/// module is a seed, in enumeration order. Modules that declare nothing are
/// omitted from the result.
///
/// # Errors
///
/// * [`GraphError::MissingBase`] / [`GraphError::MultipleBases`] — the set
///   must contain exactly one bootstrap module.
/// * [`GraphError::DuplicateProvide`] — a namespace with two owners.
/// * [`GraphError::UnsatisfiedRequire`] — a require with no owner.
/// * [`GraphError::CyclicRequire`] — a require chain that loops.
/// * [`GraphError::UnknownEntryPoint`] — `entry` is not in the set.
pub fn order(modules: &ModuleSet, entry: Option<&Path>) -> Result<Vec<Arc<Module>>> {
    let base = find_base(modules)?;
    let index = ProvideIndex::build(modules)?;

    let mut marks: FxHashMap<&Path, Mark> = FxHashMap::default();
    let mut ordering: Vec<Arc<Module>> = Vec::new();

    // The base module is settled before any traversal starts.
    marks.insert(base.path(), Mark::Done);
    ordering.push(Arc::clone(base));

    match entry {
        Some(path) => {
            let module = modules
                .get(path)
                .ok_or_else(|| GraphError::UnknownEntryPoint(path.to_path_buf()))?;
            visit(module, &index, &mut marks, &mut ordering)?;
        }
        None => {
            for module in modules.values() {
                if module.role() == Role::Lib {
                    visit(module, &index, &mut marks, &mut ordering)?;
                }
            }
        }
    }

    Ok(ordering)
}

/// Locate the unique module that provides the root namespace.
fn find_base(modules: &ModuleSet) -> Result<&Arc<Module>> {
    let mut base: Option<&Arc<Module>> = None;
    for module in modules.values() {
        if module.provides().iter().any(|p| p == BASE_NAMESPACE) {
            if let Some(first) = base {
                return Err(GraphError::MultipleBases {
                    first: first.path().to_path_buf(),
                    second: module.path().to_path_buf(),
                });
            }
            base = Some(module);
        }
    }
    base.ok_or(GraphError::MissingBase)
}

/// Depth-first post-order visit: requires before the requiring module.
fn visit<'a>(
    module: &'a Arc<Module>,
    index: &ProvideIndex<'a>,
    marks: &mut FxHashMap<&'a Path, Mark>,
    ordering: &mut Vec<Arc<Module>>,
) -> Result<()> {
    if marks.contains_key(module.path()) {
        return Ok(());
    }
    marks.insert(module.path(), Mark::Visiting);

    for namespace in module.requires() {
        let target = index
            .owner(namespace)
            .ok_or_else(|| GraphError::UnsatisfiedRequire {
                namespace: namespace.clone(),
                module: module.path().to_path_buf(),
            })?;
        match marks.get(target.path()) {
            Some(Mark::Done) => {}
            Some(Mark::Visiting) => {
                return Err(GraphError::CyclicRequire {
                    namespace: namespace.clone(),
                    module: module.path().to_path_buf(),
                });
            }
            None => visit(target, index, marks, ordering)?,
        }
    }

    marks.insert(module.path(), Mark::Done);
    if !module.has_no_declarations() {
        ordering.push(Arc::clone(module));
    }
    Ok(())
}
