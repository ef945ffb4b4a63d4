//! The graph service façade.
//!
//! Owns the active module set and the ordering cache, applies watch events
//! through a single task so mutations never interleave, and serves
//! consistent snapshots to concurrent readers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lode_graph::{Module, ModuleSet, Role, canonical, order};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::broadcast;

use crate::config::{OnReloadError, PatternSets, ServiceConfig};
use crate::discovery::discover;
use crate::error::{Result, ServiceError};
use crate::events::ServiceEvent;
use crate::watcher::{FileChange, FileWatcher};

/// Cache key for a computed ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OrderKey {
    /// The blanket ordering over all library modules.
    All,
    /// The closure of one entry module, keyed by canonical path.
    Entry(PathBuf),
}

/// Module set plus ordering cache, guarded together so a reader can never
/// observe a cache entry from a different module set.
struct GraphState {
    modules: Arc<ModuleSet>,
    cache: FxHashMap<OrderKey, Arc<Vec<Arc<Module>>>>,
}

struct ServiceState {
    cwd: PathBuf,
    policy: OnReloadError,
    patterns: PatternSets,
    graph: RwLock<GraphState>,
    events: broadcast::Sender<ServiceEvent>,
}

impl ServiceState {
    fn snapshot(&self) -> Arc<ModuleSet> {
        Arc::clone(&self.graph.read().modules)
    }

    fn ordering(&self, entry: Option<&Path>) -> Result<Arc<Vec<Arc<Module>>>> {
        let (key, entry) = match entry {
            Some(path) => {
                let identity = canonical(path, &self.cwd);
                (OrderKey::Entry(identity.clone()), Some(identity))
            }
            None => (OrderKey::All, None),
        };

        let snapshot = {
            let graph = self.graph.read();
            if let Some(hit) = graph.cache.get(&key) {
                return Ok(Arc::clone(hit));
            }
            Arc::clone(&graph.modules)
        };

        let ordering = Arc::new(order(&snapshot, entry.as_deref())?);

        let mut graph = self.graph.write();
        // Only cache results computed from the current module set; a
        // mutation may have landed while we were sorting.
        if Arc::ptr_eq(&graph.modules, &snapshot) {
            graph.cache.insert(key, Arc::clone(&ordering));
        }
        Ok(ordering)
    }

    /// Replace (or add) the record for `module`'s identity, invalidating
    /// every cached ordering.
    fn insert(&self, module: Arc<Module>) {
        let mut graph = self.graph.write();
        let modules = Arc::make_mut(&mut graph.modules);
        modules.insert(module.path().to_path_buf(), module);
        graph.cache.clear();
    }

    /// Remove the record for `path`, invalidating the cache when present.
    fn remove(&self, path: &Path) -> bool {
        let mut graph = self.graph.write();
        let removed = Arc::make_mut(&mut graph.modules).remove(path).is_some();
        if removed {
            graph.cache.clear();
        }
        removed
    }

    fn emit(&self, event: ServiceEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }

    /// Apply one watch event. Mutations are serialized because this runs
    /// only on the apply task.
    async fn apply(&self, change: FileChange) {
        let Some(role) = self.patterns.classify(change.path()) else {
            return;
        };
        match change {
            FileChange::Created(path) | FileChange::Modified(path) => {
                match Module::load(&path, role, &self.cwd).await {
                    Ok(module) => {
                        let identity = module.path().to_path_buf();
                        self.insert(module);
                        tracing::debug!(path = %identity.display(), "module reloaded");
                        self.emit(ServiceEvent::Updated { path: identity });
                    }
                    Err(err) => {
                        let identity = canonical(&path, &self.cwd);
                        tracing::warn!(
                            path = %identity.display(),
                            error = %err,
                            "reload failed, previous state stands"
                        );
                        if self.policy == OnReloadError::Drop {
                            self.remove(&identity);
                        }
                        self.emit(ServiceEvent::Error {
                            message: err.to_string(),
                        });
                    }
                }
            }
            FileChange::Removed(path) => {
                let identity = canonical(&path, &self.cwd);
                if self.remove(&identity) {
                    tracing::debug!(path = %identity.display(), "module removed");
                    self.emit(ServiceEvent::Removed { path: identity });
                }
            }
        }
    }
}

/// Live dependency-graph service over a watched collection of modules.
///
/// Constructed with [`GraphService::start`], which performs the initial
/// bulk scan and then keeps the module set current from file-system events
/// until [`GraphService::stop`] or drop. Readers may query concurrently;
/// every query observes a fully-old or fully-new module set, never a
/// partially applied mutation.
pub struct GraphService {
    state: Arc<ServiceState>,
    scan_errors: Vec<String>,
    watcher: Mutex<Option<FileWatcher>>,
    apply_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl GraphService {
    /// Scan the configured patterns, start watching, and return the ready
    /// service. Resolution of this future is the readiness signal.
    ///
    /// Files that fail to load during the scan are skipped so one bad file
    /// does not block the rest of the set; their errors are kept on the
    /// returned service, see [`GraphService::scan_errors`]. Nothing is
    /// committed if the future is dropped mid-scan.
    ///
    /// # Errors
    ///
    /// Fails when the working directory is missing, a pattern does not
    /// compile, the walk fails, or the watcher cannot be created.
    pub async fn start(mut config: ServiceConfig) -> Result<Self> {
        config.cwd = tokio::fs::canonicalize(&config.cwd)
            .await
            .map_err(|_| ServiceError::CwdNotFound(config.cwd.clone()))?;
        let patterns = PatternSets::compile(&config)?;

        // Stage the initial set off to the side and commit it in one step.
        let mut staged = ModuleSet::new();
        let mut load_errors = Vec::new();
        for (path, role) in discover(&config.cwd, &patterns).await? {
            match Module::load(&path, role, &config.cwd).await {
                Ok(module) => {
                    staged.insert(module.path().to_path_buf(), module);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping file");
                    load_errors.push(err.to_string());
                }
            }
        }
        let committed = staged.len();
        tracing::info!(
            modules = committed,
            cwd = %config.cwd.display(),
            "initial scan complete"
        );

        let (events, _) = broadcast::channel(64);
        let state = Arc::new(ServiceState {
            cwd: config.cwd.clone(),
            policy: config.on_reload_error,
            patterns,
            graph: RwLock::new(GraphState {
                modules: Arc::new(staged),
                cache: FxHashMap::default(),
            }),
            events,
        });

        let (watcher, mut rx) = FileWatcher::new(config.cwd, config.debounce_ms)?;
        let apply_state = Arc::clone(&state);
        let apply_task = tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                apply_state.apply(change).await;
            }
        });

        Ok(Self {
            state,
            scan_errors: load_errors,
            watcher: Mutex::new(Some(watcher)),
            apply_task: Mutex::new(Some(apply_task)),
        })
    }

    /// Errors for files that were skipped during the initial scan.
    ///
    /// Empty when every discovered file loaded cleanly.
    pub fn scan_errors(&self) -> &[String] {
        &self.scan_errors
    }

    /// Working directory all identities are resolved against.
    pub fn cwd(&self) -> &Path {
        &self.state.cwd
    }

    /// Look up a module by identity. `path` may be relative to the working
    /// directory.
    pub fn module(&self, path: &Path) -> Option<Arc<Module>> {
        let identity = canonical(path, &self.state.cwd);
        self.state.snapshot().get(&identity).cloned()
    }

    /// Number of modules in the active set.
    pub fn module_count(&self) -> usize {
        self.state.snapshot().len()
    }

    /// Compute (or serve from cache) the load order.
    ///
    /// With an entry path, only that module's transitive closure is
    /// ordered; without one, every library module is included. Results are
    /// cached until the module set changes.
    ///
    /// # Errors
    ///
    /// Surfaces the graph-level errors from [`lode_graph::order`] verbatim;
    /// a failed call does not disturb cached orderings for other keys.
    pub fn ordering(&self, entry: Option<&Path>) -> Result<Arc<Vec<Arc<Module>>>> {
        self.state.ordering(entry)
    }

    /// Load order as bare identities, the shape compiler invocations
    /// consume.
    pub fn ordered_paths(&self, entry: Option<&Path>) -> Result<Vec<PathBuf>> {
        Ok(self
            .ordering(entry)?
            .iter()
            .map(|module| module.path().to_path_buf())
            .collect())
    }

    /// Subscribe to update, removal, and error notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.state.events.subscribe()
    }

    /// Load (or reload) a single path into the set with an explicit role,
    /// bypassing the watcher.
    ///
    /// # Errors
    ///
    /// A failed load leaves the previous record, if any, in place.
    pub async fn add_module(&self, path: &Path, role: Role) -> Result<Arc<Module>> {
        let module = Module::load(path, role, &self.state.cwd).await?;
        let identity = module.path().to_path_buf();
        self.state.insert(Arc::clone(&module));
        self.state.emit(ServiceEvent::Updated { path: identity });
        Ok(module)
    }

    /// Remove a module from the set. Returns false when the identity was
    /// not being managed.
    pub fn remove_module(&self, path: &Path) -> bool {
        let identity = canonical(path, &self.state.cwd);
        let removed = self.state.remove(&identity);
        if removed {
            self.state.emit(ServiceEvent::Removed { path: identity });
        }
        removed
    }

    /// Release the watch subscription and stop applying events. Queries
    /// keep working against the frozen module set.
    pub fn stop(&self) {
        if let Some(task) = self.apply_task.lock().take() {
            task.abort();
        }
        self.watcher.lock().take();
        tracing::debug!("service stopped");
    }
}

impl Drop for GraphService {
    fn drop(&mut self) {
        self.stop();
    }
}
