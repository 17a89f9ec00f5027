// EveTranslator - app/session.rs
//
// One channel session: a Stopped/Running state machine around a LogTailer,
// plus the background thread that ticks it.
//
// Architecture:
//   - `SessionController` is the state machine. It owns the tailer and is
//     advanced only by explicit calls (start, stop, switch_source, tick), so
//     tests drive it without timers.
//   - `SessionRunner` shares the controller behind a mutex with a poll
//     thread. The thread ticks once per polling interval and sleeps in short
//     slices so a cancel flag is noticed promptly.
//   - A tick performs one read and forwards any lines to the pipeline worker
//     as a single batch. It never waits on the worker.

use crate::app::pipeline::WorkItem;
use crate::app::tail::LogTailer;
use crate::core::discovery::age_secs;
use crate::core::model::{AppEvent, SessionConfig, SessionKind};
use crate::platform::fs::modified_utc;
use crate::util::constants::CANCEL_CHECK_INTERVAL_MS;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
}

// =============================================================================
// SessionController
// =============================================================================

pub struct SessionController {
    kind: SessionKind,
    state: SessionState,
    tailer: Option<LogTailer>,
    config: SessionConfig,
    work_tx: mpsc::Sender<WorkItem>,
    events: mpsc::Sender<AppEvent>,
}

impl SessionController {
    pub fn new(
        kind: SessionKind,
        config: SessionConfig,
        work_tx: mpsc::Sender<WorkItem>,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            kind,
            state: SessionState::Stopped,
            tailer: None,
            config,
            work_tx,
            events,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Takes effect on the next tick or source change.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    /// Transcript currently being tailed.
    pub fn current_path(&self) -> Option<&Path> {
        self.tailer.as_ref().map(LogTailer::path)
    }

    /// Stopped -> Running on `path`.
    ///
    /// Returns `false` (and changes nothing) when already running.
    pub fn start(&mut self, path: &Path) -> bool {
        if self.is_running() {
            tracing::debug!(session = %self.kind, "Start ignored; already running");
            return false;
        }
        self.open_source(path);
        self.state = SessionState::Running;
        tracing::info!(session = %self.kind, file = %path.display(), "Session started");
        self.emit(AppEvent::SessionStateChanged {
            session: self.kind,
            running: true,
        });
        true
    }

    /// Running -> Stopped. Safe to call in any state.
    pub fn stop(&mut self) {
        if let Some(mut tailer) = self.tailer.take() {
            tailer.close();
        }
        if self.state == SessionState::Stopped {
            return;
        }
        self.state = SessionState::Stopped;
        tracing::info!(session = %self.kind, "Session stopped");
        self.emit(AppEvent::SessionStateChanged {
            session: self.kind,
            running: false,
        });
    }

    /// Running -> Running on a new transcript.
    ///
    /// Returns `false` when stopped; a stopped session is started with
    /// `start` instead.
    pub fn switch_source(&mut self, path: &Path) -> bool {
        if !self.is_running() {
            tracing::debug!(session = %self.kind, "Switch ignored; session stopped");
            return false;
        }
        if let Some(mut old) = self.tailer.take() {
            old.close();
        }
        self.emit(AppEvent::HistoryCleared { session: self.kind });
        self.open_source(path);
        tracing::info!(session = %self.kind, file = %path.display(), "Session switched source");
        true
    }

    /// One poll: read new lines and forward them as one batch.
    ///
    /// Returns the number of lines forwarded.
    pub fn tick(&mut self) -> usize {
        if !self.is_running() {
            return 0;
        }
        let Some(tailer) = self.tailer.as_mut() else {
            return 0;
        };
        let lines = tailer.read_new_lines();
        let count = lines.len();
        if count > 0 {
            self.dispatch(lines);
        }
        count
    }

    /// Open a tailer on `path`, backfill if the file is fresh, then move the
    /// cursor to the end.
    fn open_source(&mut self, path: &Path) {
        let mut tailer = LogTailer::open(path);

        if self.config.history_lines > 0 {
            let fresh = modified_utc(path)
                .map(|mtime| age_secs(mtime, Utc::now()) < self.config.history_freshness_secs)
                .unwrap_or(false);
            if fresh {
                let history = tailer.read_last_n_lines(self.config.history_lines);
                tracing::debug!(session = %self.kind, lines = history.len(), "History backfill");
                if !history.is_empty() {
                    self.dispatch(history);
                }
            } else {
                tracing::debug!(session = %self.kind, file = %path.display(), "Source stale; no backfill");
            }
        }

        tailer.seek_to_end();
        self.tailer = Some(tailer);
    }

    fn dispatch(&self, lines: Vec<String>) {
        let item = WorkItem::Lines {
            session: self.kind,
            lines,
        };
        if self.work_tx.send(item).is_err() {
            tracing::warn!(session = %self.kind, "Pipeline worker gone; lines dropped");
        }
    }

    fn emit(&self, event: AppEvent) {
        // Presentation may have gone away during shutdown.
        let _ = self.events.send(event);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(mut tailer) = self.tailer.take() {
            tailer.close();
        }
    }
}

// =============================================================================
// SessionRunner
// =============================================================================

/// A controller plus the thread that polls it.
pub struct SessionRunner {
    controller: Arc<Mutex<SessionController>>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

fn lock(controller: &Mutex<SessionController>) -> MutexGuard<'_, SessionController> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionRunner {
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            cancel_flag: None,
        }
    }

    pub fn kind(&self) -> SessionKind {
        lock(&self.controller).kind()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.controller).is_running()
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        lock(&self.controller).current_path().map(Path::to_path_buf)
    }

    pub fn set_config(&self, config: SessionConfig) {
        lock(&self.controller).set_config(config);
    }

    /// Start tailing `path` and begin polling.
    pub fn start(&mut self, path: &Path) -> bool {
        if !lock(&self.controller).start(path) {
            return false;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flag = Some(Arc::clone(&cancel));
        let controller = Arc::clone(&self.controller);
        let kind = lock(&controller).kind();

        let spawned = std::thread::Builder::new()
            .name(format!("session-{kind}"))
            .spawn(move || run_poll_loop(controller, cancel));
        if let Err(e) = spawned {
            tracing::error!(session = %kind, error = %e, "Cannot start poll thread");
            self.stop();
            return false;
        }
        true
    }

    /// Stop polling and close the tailer. Safe to call at any time.
    pub fn stop(&mut self) {
        if let Some(flag) = self.cancel_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
        lock(&self.controller).stop();
    }

    /// Switch to `path` while running. The poll thread keeps running; the
    /// controller lock keeps it from reading mid-switch.
    pub fn switch_source(&self, path: &Path) -> bool {
        lock(&self.controller).switch_source(path)
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_poll_loop(controller: Arc<Mutex<SessionController>>, cancel: Arc<AtomicBool>) {
    let slice = Duration::from_millis(CANCEL_CHECK_INTERVAL_MS);
    loop {
        let interval = {
            let mut c = lock(&controller);
            if cancel.load(Ordering::Relaxed) || !c.is_running() {
                tracing::debug!(session = %c.kind(), "Poll thread exiting");
                return;
            }
            c.tick();
            c.config().polling_interval
        };

        let mut slept = Duration::ZERO;
        while slept < interval {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let step = slice.min(interval - slept);
            std::thread::sleep(step);
            slept += step;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
