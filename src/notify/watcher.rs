//! File watching for file-backed sources.

use crate::core::Aggregator;
use crate::core::location::expand;
use crate::error::{ConfigError, Result};
use crate::sources::SourceKind;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Watches directories and reports changed files in debounced batches.
///
/// Directories are watched rather than files so that overlay files created
/// after the watch starts are noticed too.
///
/// # Examples
///
/// ```rust,no_run
/// use configr::notify::FileWatcher;
/// use std::time::Duration;
///
/// # async fn example() -> configr::error::Result<()> {
/// let (watcher, mut rx) = FileWatcher::new(Duration::from_millis(200))?;
/// watcher.watch_dir("config")?;
///
/// while let Some(paths) = rx.recv().await {
///     println!("changed: {:?}", paths);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    watcher: Mutex<RecommendedWatcher>,
    debounce_duration: Duration,
    watched_dirs: Mutex<Vec<PathBuf>>,
}

impl FileWatcher {
    /// Create a watcher and the receiver of changed-path batches.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file watcher cannot be created.
    pub fn new(debounce_duration: Duration) -> Result<(Self, mpsc::Receiver<Vec<PathBuf>>)> {
        let (tx, rx) = mpsc::channel(100);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Modify(_)
                        | notify::EventKind::Create(_)
                        | notify::EventKind::Remove(_)
                ) {
                    let _ = event_tx.send(event.paths);
                }
            }
        })
        .map_err(|e| ConfigError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        // gather events until the stream has been quiet for the debounce window
        tokio::spawn(async move {
            while let Some(first) = event_rx.recv().await {
                let mut changed: BTreeSet<PathBuf> = first.into_iter().collect();
                let quiet = sleep(debounce_duration);
                tokio::pin!(quiet);
                loop {
                    tokio::select! {
                        _ = &mut quiet => break,
                        more = event_rx.recv() => match more {
                            Some(paths) => changed.extend(paths),
                            None => break,
                        },
                    }
                }
                if tx.send(changed.into_iter().collect()).await.is_err() {
                    break;
                }
            }
        });

        Ok((
            Self {
                watcher: Mutex::new(watcher),
                debounce_duration,
                watched_dirs: Mutex::new(Vec::new()),
            },
            rx,
        ))
    }

    /// Watch a directory (non-recursively).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or cannot be watched.
    pub fn watch_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let canonical = dir.as_ref().canonicalize().map_err(|e| {
            ConfigError::WatchError(format!(
                "Failed to resolve {}: {}",
                dir.as_ref().display(),
                e
            ))
        })?;

        let mut dirs = self.watched_dirs.lock().unwrap_or_else(PoisonError::into_inner);
        if dirs.contains(&canonical) {
            return Ok(canonical);
        }

        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watch(&canonical, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError(format!("Failed to watch path: {}", e)))?;
        dirs.push(canonical.clone());
        Ok(canonical)
    }

    /// The debounce window.
    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }

    /// Directories currently watched.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watched_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Keeps an aggregator's file watch alive; dropping it stops watching.
pub struct WatchHandle {
    watcher: FileWatcher,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Directories being watched.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watcher.watched_dirs()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start refreshing `aggregator`'s file sources when their files change.
///
/// Only sources present when the watch starts are covered. Refresh failures
/// are logged and the last good configuration is kept.
pub(crate) fn watch(aggregator: &Arc<Aggregator>, debounce: Duration) -> Result<WatchHandle> {
    let (watcher, mut rx) = FileWatcher::new(debounce)?;
    let mut targets: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();

    for source in aggregator.sources() {
        if source.kind() != SourceKind::File {
            continue;
        }
        let descriptor = source.descriptor();
        for location in expand(&descriptor.location, &descriptor.modifiers) {
            let path = Path::new(&location);
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let Some(file_name) = path.file_name() else {
                continue;
            };
            match watcher.watch_dir(dir) {
                Ok(canonical) => {
                    targets
                        .entry(canonical.join(file_name))
                        .or_default()
                        .insert(source.identity().to_string());
                }
                Err(e) => warn!(location = %location, error = %e, "not watching location"),
            }
        }
    }

    info!(dirs = watcher.watched_dirs().len(), "configr: watching source files");
    let weak: Weak<Aggregator> = Arc::downgrade(aggregator);
    let task = tokio::spawn(async move {
        while let Some(paths) = rx.recv().await {
            let Some(aggregator) = weak.upgrade() else {
                break;
            };
            let identities: BTreeSet<&String> = paths
                .iter()
                .filter_map(|path| targets.get(path))
                .flatten()
                .collect();
            for identity in identities {
                debug!(source = %identity, "file change detected");
                if let Err(e) = aggregator.refresh_source(identity).await {
                    warn!(source = %identity, error = %e, "refresh after file change failed");
                }
            }
        }
    });

    Ok(WatchHandle { watcher, task })
}
