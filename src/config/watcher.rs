//! Configuration file watcher for hot reload.
//!
//! # States
//! - Idle: no cycle running
//! - Reloading: the guarded reload/save cycle is in progress
//!
//! # Flow
//! ```text
//! notify thread ──▶ single-writer queue ──▶ on_filesystem_event(now)
//!                                              │ elapsed < window → Debounced
//!                                              ▼
//!                                         take guard
//!                                              │ file missing → FileMissing
//!                                              ▼
//!                          suppress save-on-set → reload → save → restore
//!                                              ▼
//!                                   last_reload = now
//! ```
//!
//! # Design Decisions
//! - The debounce check runs before the guard; a notification past the
//!   window that arrives mid-cycle waits for the guard instead of being dropped
//! - The save performed by a cycle touches the watched file; the resulting
//!   notifications fall inside the window and are discarded
//! - A failed cycle still stamps `last_reload`, so a broken file cannot cause
//!   a retry storm

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::ConfigError;
use crate::config::schema::ConfigFileLocation;
use crate::config::store::{ConfigStore, SaveOnSetGuard};
use crate::observability::metrics;

/// Minimum time between two accepted reloads.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Errors from establishing the watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Config directory {path} does not exist")]
    DirectoryMissing { path: PathBuf },

    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Kind of raw notification forwarded to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Changed,
    Created,
    Renamed,
}

/// A filesystem notification waiting in the queue.
#[derive(Debug, Clone)]
pub struct FsNotification {
    pub kind: NotificationKind,
    pub received_at: Instant,
}

/// What a single call to the handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Inside the debounce window; nothing done.
    Debounced,
    /// Config file absent; reload skipped.
    FileMissing,
    /// Reload and save completed.
    Reloaded,
    /// Reload or save failed; the error was logged.
    Failed,
}

impl ReloadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadOutcome::Debounced => "debounced",
            ReloadOutcome::FileMissing => "file_missing",
            ReloadOutcome::Reloaded => "reloaded",
            ReloadOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Reloading,
}

/// Receiving end of the single-writer notification queue.
pub struct NotificationQueue {
    rx: mpsc::UnboundedReceiver<FsNotification>,
}

impl NotificationQueue {
    /// Next notification without waiting.
    pub fn try_next(&mut self) -> Option<FsNotification> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next notification. `None` once the watch is released.
    pub async fn next(&mut self) -> Option<FsNotification> {
        self.rx.recv().await
    }
}

/// Map a raw notify event onto a notification for the config file, if any.
pub fn classify(event: &Event, file_name: &str) -> Option<NotificationKind> {
    let kind = match event.kind {
        EventKind::Create(_) => NotificationKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => NotificationKind::Renamed,
        EventKind::Modify(_) => NotificationKind::Changed,
        _ => return None,
    };
    let names_config = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(OsStr::new(file_name)));
    names_config.then_some(kind)
}

/// Clears the reloading flag when the cycle ends, however it ends.
struct ReloadingMark<'a>(&'a AtomicBool);

impl<'a> ReloadingMark<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ReloadingMark<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Keeps the in-memory config consistent with a file edited behind its back.
pub struct ConfigReloadCoordinator {
    location: ConfigFileLocation,
    store: Arc<dyn ConfigStore>,
    debounce: Duration,
    last_reload: Mutex<Option<Instant>>,
    reload_lock: Mutex<()>,
    reloading: AtomicBool,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl ConfigReloadCoordinator {
    pub fn new(location: ConfigFileLocation, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            location,
            store,
            debounce: DEFAULT_DEBOUNCE,
            last_reload: Mutex::new(None),
            reload_lock: Mutex::new(()),
            reloading: AtomicBool::new(false),
            watcher: Mutex::new(None),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn location(&self) -> &ConfigFileLocation {
        &self.location
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Time of the last completed cycle, successful or not.
    pub fn last_reload(&self) -> Option<Instant> {
        *self.last_reload.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CoordinatorState {
        if self.reloading.load(Ordering::SeqCst) {
            CoordinatorState::Reloading
        } else {
            CoordinatorState::Idle
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Start watching the config directory, subdirectories included.
    ///
    /// Notifications are queued; the caller owns the returned queue and
    /// feeds it back through `drain` or `run`. Starting again replaces the
    /// previous watch.
    pub fn start(&self) -> Result<NotificationQueue, WatchError> {
        let directory = self.location.directory();
        if !directory.is_dir() {
            return Err(WatchError::DirectoryMissing {
                path: directory.to_path_buf(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let file_name = self.location.file_name().to_owned();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(kind) = classify(&event, &file_name) {
                        let _ = tx.send(FsNotification {
                            kind,
                            received_at: Instant::now(),
                        });
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )?;
        watcher.watch(directory, RecursiveMode::Recursive)?;

        *self.watcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(watcher);
        tracing::info!(path = %directory.display(), file = self.location.file_name(), "Config watcher started");
        Ok(NotificationQueue { rx })
    }

    /// Release the watch. Safe to call any number of times.
    pub fn stop(&self) {
        let released = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            tracing::info!("Config watcher stopped");
        }
    }

    /// Handle one raw notification observed at `now`.
    ///
    /// Never fails: reload errors are logged and contained.
    pub fn on_filesystem_event(&self, now: Instant) -> ReloadOutcome {
        if let Some(last) = self.last_reload() {
            if now.saturating_duration_since(last) < self.debounce {
                tracing::trace!("Config change inside debounce window, ignored");
                return ReloadOutcome::Debounced;
            }
        }

        let outcome = {
            let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

            if !self.location.full_path().exists() {
                tracing::warn!(
                    path = %self.location.full_path().display(),
                    "Config file does not exist. Skipping reload."
                );
                metrics::record_reload(ReloadOutcome::FileMissing.as_str());
                return ReloadOutcome::FileMissing;
            }

            let _mark = ReloadingMark::enter(&self.reloading);
            tracing::debug!("Reloading configuration...");
            let outcome = match self.reload_then_save() {
                Ok(()) => {
                    tracing::info!("Configuration reload complete.");
                    ReloadOutcome::Reloaded
                }
                Err(e) => {
                    tracing::error!(error = %e, "Error reloading configuration");
                    ReloadOutcome::Failed
                }
            };
            // Stamped under the guard so cycles record their times in order.
            *self.last_reload.lock().unwrap_or_else(PoisonError::into_inner) = Some(now);
            outcome
        };

        metrics::record_reload(outcome.as_str());
        outcome
    }

    fn reload_then_save(&self) -> Result<(), ConfigError> {
        let _suppressed = SaveOnSetGuard::new(&*self.store);
        self.store.reload()?;
        self.store.save()?;
        metrics::record_save("reload");
        Ok(())
    }

    /// Flush the in-memory state once, with save-on-set suppressed.
    pub fn shutdown(&self) -> Result<(), ConfigError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _suppressed = SaveOnSetGuard::new(&*self.store);
        match self.store.save() {
            Ok(()) => {
                metrics::record_save("shutdown");
                tracing::debug!("Configuration saved on shutdown");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Error saving configuration on shutdown");
                Err(e)
            }
        }
    }

    /// Process every queued notification. Returns the outcomes in order.
    pub fn drain(&self, queue: &mut NotificationQueue) -> Vec<ReloadOutcome> {
        let mut outcomes = Vec::new();
        while let Some(notification) = queue.try_next() {
            tracing::trace!(kind = ?notification.kind, "Config notification");
            outcomes.push(self.on_filesystem_event(notification.received_at));
        }
        outcomes
    }

    /// Consume notifications until shutdown is signalled or the watch ends.
    pub async fn run(
        self: Arc<Self>,
        mut queue: NotificationQueue,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                notification = queue.next() => match notification {
                    Some(notification) => {
                        tracing::trace!(kind = ?notification.kind, "Config notification");
                        self.on_filesystem_event(notification.received_at);
                    }
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Config notification loop finished");
    }
}

impl Drop for ConfigReloadCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
