//! Audio inbox monitoring
//!
//! Watches a directory for new recordings and queues the ones not yet
//! processed. A file is queued once it is non-empty, its size is the same on
//! two consecutive looks, and it has not been written for the settle period.
//! Processed file names are kept in a newline-delimited log so they survive
//! restarts.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "flac"];

/// Subdirectory of the inbox that archived recordings move into
pub const ARCHIVE_DIR_NAME: &str = "processed";

/// How long a file must go unmodified before it is queued
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Failed to create file watcher: {0}")]
    WatcherError(String),
    #[error("Failed to watch path: {0}")]
    PathError(String),
    #[error("Inbox I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Not an inbox recording: {0}")]
    UnknownFile(String),
}

/// Whether `path` names a visible audio file we handle
pub fn is_supported_audio(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Names of files already processed, persisted one per line
#[derive(Debug)]
pub struct ProcessedLog {
    path: PathBuf,
    names: HashSet<String>,
}

impl ProcessedLog {
    /// Load the log; a missing file is an empty log
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, InboxError> {
        let path = path.into();
        let names = if path.exists() {
            fs::read_to_string(&path)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            HashSet::new()
        };
        Ok(ProcessedLog { path, names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn mark_processed(&mut self, name: &str) -> Result<(), InboxError> {
        if !self.names.insert(name.to_string()) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", name)?;
        Ok(())
    }
}

type Shared = Arc<Mutex<State>>;

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[derive(Debug)]
struct State {
    log: ProcessedLog,
    settle: Duration,
    /// Last observed size of files still being written
    candidates: BTreeMap<PathBuf, u64>,
    pending: VecDeque<PathBuf>,
    /// Names handed to the host and not yet marked processed
    in_flight: HashSet<String>,
}

impl State {
    fn is_handled(&self, name: &str) -> bool {
        self.log.contains(name)
            || self.in_flight.contains(name)
            || self.pending.iter().any(|p| file_name(p) == Some(name))
    }

    fn observe(&mut self, path: PathBuf) {
        if !is_supported_audio(&path) {
            return;
        }
        let Some(name) = file_name(&path) else {
            return;
        };
        if self.is_handled(name) {
            return;
        }
        let Ok(meta) = fs::metadata(&path) else {
            self.candidates.remove(&path);
            return;
        };
        if !meta.is_file() {
            return;
        }
        if !self.candidates.contains_key(&path) {
            debug!(path = %path.display(), size = meta.len(), "audio file seen");
            self.candidates.insert(path, meta.len());
        }
    }

    /// Queue candidates whose size is non-zero, unchanged and settled
    fn promote_settled(&mut self) {
        let now = SystemTime::now();
        let settle = self.settle;
        let mut ready = Vec::new();

        self.candidates.retain(|path, last_size| {
            let Ok(meta) = fs::metadata(path) else {
                return false;
            };
            let size = meta.len();
            if size != *last_size {
                *last_size = size;
                return true;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or(Duration::ZERO);
            if size > 0 && age >= settle {
                ready.push(path.clone());
                return false;
            }
            true
        });

        for path in ready {
            info!(path = %path.display(), "new audio file");
            self.pending.push_back(path);
        }
    }
}

pub struct InboxMonitor {
    dir: PathBuf,
    state: Shared,
    _watcher: RecommendedWatcher,
    _handle: thread::JoinHandle<()>,
}

impl InboxMonitor {
    /// Start watching `dir` with the default settle period
    pub fn new(dir: impl Into<PathBuf>, log: ProcessedLog) -> Result<Self, InboxError> {
        Self::with_settle(dir, log, DEFAULT_SETTLE)
    }

    /// Start watching `dir`, creating it if needed
    ///
    /// Files already present are not looked at; call [`InboxMonitor::scan`]
    /// for those.
    pub fn with_settle(
        dir: impl Into<PathBuf>,
        log: ProcessedLog,
        settle: Duration,
    ) -> Result<Self, InboxError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let state: Shared = Arc::new(Mutex::new(State {
            log,
            settle,
            candidates: BTreeMap::new(),
            pending: VecDeque::new(),
            in_flight: HashSet::new(),
        }));

        let (tx, rx): (_, Receiver<Result<Event, notify::Error>>) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(|e| InboxError::WatcherError(e.to_string()))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| InboxError::PathError(e.to_string()))?;

        // Ends when the watcher, and with it the sender, is dropped
        let events_state = Arc::clone(&state);
        let handle = thread::spawn(move || loop {
            let event = match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => Some(event),
                Ok(Err(e)) => {
                    warn!(error = %e, "inbox watch error");
                    None
                }
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let Ok(mut state) = events_state.lock() else {
                break;
            };
            if let Some(event) = event {
                use notify::EventKind::*;
                if let Create(_) | Modify(_) = event.kind {
                    for path in event.paths {
                        state.observe(path);
                    }
                }
            }
            state.promote_settled();
        });

        debug!(dir = %dir.display(), settle_ms = settle.as_millis() as u64, "watching inbox");
        Ok(InboxMonitor {
            dir,
            state,
            _watcher: watcher,
            _handle: handle,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look at files already in the inbox and queue the settled ones
    ///
    /// Returns how many were queued. Files still being written are queued
    /// later by the watcher.
    pub fn scan(&self) -> Result<usize, InboxError> {
        let entries: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();

        let mut state = self.lock();
        let before = state.pending.len();
        for path in entries {
            state.observe(path);
        }
        state.promote_settled();
        Ok(state.pending.len() - before)
    }

    /// Drain the pending queue
    ///
    /// Drained files are not queued again until marked processed.
    pub fn take_pending(&self) -> Vec<PathBuf> {
        let mut state = self.lock();
        let taken: Vec<PathBuf> = state.pending.drain(..).collect();
        for path in &taken {
            if let Some(name) = file_name(path) {
                state.in_flight.insert(name.to_string());
            }
        }
        taken
    }

    pub fn mark_processed(&self, name: &str) -> Result<(), InboxError> {
        let mut state = self.lock();
        state.log.mark_processed(name)?;
        state.in_flight.remove(name);
        Ok(())
    }

    /// Move a recording into the `processed/` archive and mark it processed
    ///
    /// Returns the archived path.
    pub fn archive(&self, name: &str) -> Result<PathBuf, InboxError> {
        let src = self.dir.join(name);
        if file_name(Path::new(name)) != Some(name) || !src.is_file() {
            return Err(InboxError::UnknownFile(name.to_string()));
        }

        let archive_dir = self.dir.join(ARCHIVE_DIR_NAME);
        fs::create_dir_all(&archive_dir)?;
        let dest = archive_dir.join(name);
        fs::rename(&src, &dest)?;
        info!(dest = %dest.display(), "archived recording");

        self.mark_processed(name)?;
        Ok(dest)
    }

    pub fn is_processed(&self, name: &str) -> bool {
        self.lock().log.contains(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic in the event thread cannot leave State half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
