//! The long-lived type-analysis session.
//!
//! Owns the current [`Program`] snapshot and keeps it fresh: a `notify`
//! watcher on every directory holding member files or configs re-analyses
//! changed member files and rebuilds everything when a tsconfig in the
//! `extends` chain changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Weak};
use std::thread;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::options::{CompilerOptions, DEFAULT_TSCONFIG, ResolvedConfig};
use crate::program::tsconfig::{ProjectConfig, WatchTarget, find_config_file, normalize_path};
use crate::program::{Program, SourceFile};

/// Locates the project configuration and maintains the analysis program.
pub struct TypeAnalysisSession {
    inner: Arc<SessionInner>,
    watch: Arc<Mutex<Option<WatchState>>>,
}

/// The live watcher and the directories registered with it.
struct WatchState {
    watcher: RecommendedWatcher,
    watched: BTreeMap<PathBuf, bool>,
}

struct SessionInner {
    search_root: PathBuf,
    requested: Option<String>,
    overrides: CompilerOptions,
    project: RwLock<Arc<ProjectConfig>>,
    program: RwLock<Arc<Program>>,
    /// Serialises read-and-publish so a slow refresh never overwrites a newer one.
    refresh: Mutex<()>,
}

impl TypeAnalysisSession {
    /// Build the session and start watching the project directory.
    ///
    /// If the watcher cannot be started the session still works, but only
    /// [`refresh_file`](Self::refresh_file) and [`reload`](Self::reload)
    /// update it.
    pub fn new(search_root: &Path, config: &ResolvedConfig) -> Result<Self, SessionError> {
        let session = Self::without_watcher(search_root, config)?;
        if let Err(error) = session.start_watcher() {
            warn!(
                "[fob-react-docgen] file watching unavailable, type information will not refresh automatically: {}",
                error
            );
        }
        Ok(session)
    }

    /// Build the session without a file watcher.
    pub fn without_watcher(search_root: &Path, config: &ResolvedConfig) -> Result<Self, SessionError> {
        let search_root = normalize_path(search_root);
        let requested = config.tsconfig_path.clone();
        let overrides = config.compiler_options.clone();
        let (project, program) = build_program(&search_root, requested.as_deref(), &overrides, 0)?;

        info!(
            "[fob-react-docgen] type-analysis session ready: {} file(s) from {}",
            program.len(),
            project.config_path.display()
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                search_root,
                requested,
                overrides,
                project: RwLock::new(Arc::new(project)),
                program: RwLock::new(Arc::new(program)),
                refresh: Mutex::new(()),
            }),
            watch: Arc::new(Mutex::new(None)),
        })
    }

    /// The latest program snapshot.
    pub fn current_program(&self) -> Arc<Program> {
        self.inner.current_program()
    }

    /// A callable that re-reads the latest snapshot on every invocation.
    pub fn program_provider(&self) -> impl Fn() -> Arc<Program> + Send + Sync + 'static {
        let inner = Arc::clone(&self.inner);
        move || inner.current_program()
    }

    /// The tsconfig the session is rooted at.
    pub fn config_path(&self) -> PathBuf {
        self.inner.project.read().config_path.clone()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    /// Directories currently registered with the watcher.
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.watch
            .lock()
            .as_ref()
            .map(|state| state.watched.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Re-analyse `path` and publish a new snapshot.
    ///
    /// Paths outside the program are ignored; a deleted member is dropped.
    /// A tsconfig in the `extends` chain triggers [`reload`](Self::reload).
    pub fn refresh_file(&self, path: &Path) -> Result<(), SessionError> {
        self.inner.refresh_file(path)
    }

    /// Re-read the project configuration and rebuild the program.
    pub fn reload(&self) -> Result<(), SessionError> {
        self.inner.reload()
    }

    fn start_watcher(&self) -> notify::Result<()> {
        let (sender, events) = mpsc::channel::<PathBuf>();
        let watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let Ok(event) = result else {
                return;
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            for path in event.paths {
                let _ = sender.send(path);
            }
        })?;

        let mut state = WatchState {
            watcher,
            watched: BTreeMap::new(),
        };
        state.sync(&self.inner.current_project().watch_targets());
        if state.watched.is_empty() {
            return Err(notify::Error::generic("no project directory could be watched"));
        }
        *self.watch.lock() = Some(state);

        // The worker holds the watcher weakly so dropping the session stops it.
        let inner = Arc::clone(&self.inner);
        let watch = Arc::downgrade(&self.watch);
        let spawned = thread::Builder::new()
            .name("fob-react-docgen-watch".to_string())
            .spawn(move || process_events(events, inner, watch));
        if let Err(error) = spawned {
            *self.watch.lock() = None;
            return Err(notify::Error::io(error));
        }
        Ok(())
    }
}

impl std::fmt::Debug for TypeAnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeAnalysisSession")
            .field("search_root", &self.inner.search_root)
            .field("config_path", &self.config_path())
            .field("version", &self.current_program().version())
            .field("watching", &self.is_watching())
            .finish()
    }
}

impl SessionInner {
    fn current_program(&self) -> Arc<Program> {
        Arc::clone(&self.program.read())
    }

    fn current_project(&self) -> Arc<ProjectConfig> {
        Arc::clone(&self.project.read())
    }

    fn refresh_file(&self, path: &Path) -> Result<(), SessionError> {
        let path = normalize_path(path);
        let project = self.current_project();
        if project.is_config_file(&path) {
            debug!("[fob-react-docgen] {} changed, reloading project", path.display());
            return self.reload();
        }
        let _guard = self.refresh.lock();
        if !project.contains(&path) {
            return Ok(());
        }

        if !path.is_file() {
            let mut program = self.program.write();
            if program.contains(&path) {
                *program = Arc::new(program.without_file(&path));
                debug!("[fob-react-docgen] removed {} from the program", path.display());
            }
            return Ok(());
        }

        let file = SourceFile::read(&path).map_err(|error| SessionError::io(path.clone(), &error))?;
        if !file.diagnostics.is_empty() {
            debug!(
                "[fob-react-docgen] {} has {} parse diagnostic(s)",
                path.display(),
                file.diagnostics.len()
            );
        }
        let mut program = self.program.write();
        *program = Arc::new(program.with_file(file));
        debug!(
            "[fob-react-docgen] re-analysed {} (program version {})",
            path.display(),
            program.version()
        );
        Ok(())
    }

    fn reload(&self) -> Result<(), SessionError> {
        let _guard = self.refresh.lock();
        let version = self.program.read().version() + 1;
        let (project, program) = build_program(
            &self.search_root,
            self.requested.as_deref(),
            &self.overrides,
            version,
        )?;
        info!(
            "[fob-react-docgen] project reloaded: {} file(s) from {}",
            program.len(),
            project.config_path.display()
        );
        *self.project.write() = Arc::new(project);
        *self.program.write() = Arc::new(program);
        Ok(())
    }
}

fn build_program(
    search_root: &Path,
    requested: Option<&str>,
    overrides: &CompilerOptions,
    version: u64,
) -> Result<(ProjectConfig, Program), SessionError> {
    let config_name = requested.unwrap_or(DEFAULT_TSCONFIG);
    let config_path = find_config_file(search_root, config_name).ok_or_else(|| {
        SessionError::not_found(search_root.to_path_buf(), requested.map(str::to_string))
    })?;
    let project = ProjectConfig::load(&config_path, overrides)?;

    let mut files = Vec::new();
    for path in project.discover_files() {
        match SourceFile::read(&path) {
            Ok(file) => {
                if !file.diagnostics.is_empty() {
                    debug!(
                        "[fob-react-docgen] {} has {} parse diagnostic(s)",
                        path.display(),
                        file.diagnostics.len()
                    );
                }
                files.push(file);
            }
            Err(error) => debug!("[fob-react-docgen] skipping {}: {}", path.display(), error),
        }
    }

    let program = Program::new(
        project.root_dir.clone(),
        project.compiler_options.clone(),
        files,
    )
    .with_version(version);
    Ok((project, program))
}

impl WatchState {
    /// Register `targets` and drop directories no longer needed.
    fn sync(&mut self, targets: &[WatchTarget]) {
        let wanted: BTreeMap<PathBuf, bool> = targets
            .iter()
            .map(|target| (target.path.clone(), target.recursive))
            .collect();

        let stale: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|(path, recursive)| wanted.get(*path) != Some(*recursive))
            .map(|(path, _)| path.clone())
            .collect();
        for path in stale {
            // A deleted directory is already gone from the watcher.
            let _ = self.watcher.unwatch(&path);
            self.watched.remove(&path);
        }

        for (path, recursive) in wanted {
            if self.watched.contains_key(&path) {
                continue;
            }
            let mode = if recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            match self.watcher.watch(&path, mode) {
                Ok(()) => {
                    debug!("[fob-react-docgen] watching {}", path.display());
                    self.watched.insert(path, recursive);
                }
                Err(error) => debug!("[fob-react-docgen] cannot watch {}: {}", path.display(), error),
            }
        }
    }
}

/// Apply watcher events until the session is dropped.
///
/// Runs off the watcher's own thread so it can register new directories
/// after a reload or when a directory appears.
fn process_events(
    events: Receiver<PathBuf>,
    inner: Arc<SessionInner>,
    watch: Weak<Mutex<Option<WatchState>>>,
) {
    while let Ok(path) = events.recv() {
        if is_dependency_path(&path) {
            continue;
        }
        let project = inner.current_project();
        if let Err(error) = inner.refresh_file(&path) {
            warn!(
                "[fob-react-docgen] failed to refresh {}: {}",
                path.display(),
                error
            );
        }

        let reloaded = !Arc::ptr_eq(&project, &inner.current_project());
        if !reloaded && !path.is_dir() {
            continue;
        }
        let Some(watch) = watch.upgrade() else {
            break;
        };
        let targets = inner.current_project().watch_targets();
        if let Some(state) = watch.lock().as_mut() {
            state.sync(&targets);
        }
    }
}

fn is_dependency_path(path: &Path) -> bool {
    path.components()
        .any(|component| component.as_os_str() == "node_modules")
}
