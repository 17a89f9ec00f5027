// EveTranslator - app/dir_watcher.rs
//
// Periodic chat-log directory rescans on a background thread.
//
// Architecture:
//   - `DirWatcher` lives with the manager; `run_dir_watcher` executes on a
//     background thread that rescans the directory on a fixed interval.
//   - An `Arc<AtomicBool>` cancel flag stops the thread. The sleep between
//     scans is split into CANCEL_CHECK_INTERVAL_MS slices so cancellation
//     is noticed promptly.
//   - Each scan produces complete registry snapshots sent as `ScanUpdate`
//     over an mpsc channel. The manager drains the channel with
//     `poll_progress` and swaps the snapshots in whole.
//   - The first scan runs immediately when the watcher starts.

use crate::app::discovery::{scan_characters, scan_fleets};
use crate::core::model::{GroupRegistry, IdentityRegistry};
use crate::platform::window::WindowCheck;
use crate::util::constants::CANCEL_CHECK_INTERVAL_MS;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// =============================================================================
// Watch configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct DirWatchConfig {
    pub log_dir: PathBuf,
    /// Delay between the end of one scan and the start of the next.
    pub scan_interval: Duration,
    /// Group transcripts older than this are left out of the registry.
    pub fleet_inactive_threshold_secs: u64,
}

/// One completed scan.
#[derive(Debug, Clone)]
pub struct ScanUpdate {
    pub identities: IdentityRegistry,
    pub groups: GroupRegistry,
}

/// Run both scans once on the calling thread.
pub fn scan_once(config: &DirWatchConfig, window_check: &dyn WindowCheck) -> ScanUpdate {
    let now = Utc::now();
    ScanUpdate {
        identities: scan_characters(&config.log_dir, window_check, now),
        groups: scan_fleets(&config.log_dir, config.fleet_inactive_threshold_secs, now),
    }
}

// =============================================================================
// DirWatcher
// =============================================================================

/// Manages the background rescan thread.
pub struct DirWatcher {
    progress_rx: Option<mpsc::Receiver<ScanUpdate>>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl DirWatcher {
    /// Create an inactive watcher. No thread is started until `start_watch`.
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
        }
    }

    /// Returns `true` if a watcher thread is currently running.
    pub fn is_active(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|f| !f.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Start rescanning `config.log_dir`.
    ///
    /// A watcher that is already running is stopped first so only one
    /// channel is ever live.
    pub fn start_watch(&mut self, config: DirWatchConfig, window_check: Arc<dyn WindowCheck>) {
        self.stop_watch();

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flag = Some(Arc::clone(&cancel));

        let (tx, rx) = mpsc::channel();
        self.progress_rx = Some(rx);

        let dir = config.log_dir.clone();
        let spawned = std::thread::Builder::new()
            .name("dir-watcher".to_string())
            .spawn(move || run_dir_watcher(config, window_check, tx, cancel));
        match spawned {
            Ok(_) => tracing::debug!(dir = %dir.display(), "Directory watcher started"),
            Err(e) => {
                tracing::error!(error = %e, "Cannot start directory watcher");
                self.stop_watch();
            }
        }
    }

    /// Signal the background thread to stop and drop the channel.
    pub fn stop_watch(&mut self) {
        if let Some(flag) = self.cancel_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
        self.progress_rx = None;
    }

    /// Drain at most `max` pending scans without blocking.
    pub fn poll_progress(&mut self, max: usize) -> Vec<ScanUpdate> {
        let Some(rx) = &self.progress_rx else {
            return Vec::new();
        };
        let mut updates = Vec::with_capacity(max.min(4));
        while updates.len() < max {
            match rx.try_recv() {
                Ok(update) => updates.push(update),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.progress_rx = None;
                    self.cancel_flag = None;
                    break;
                }
            }
        }
        updates
    }
}

impl Default for DirWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        self.stop_watch();
    }
}

// =============================================================================
// Background thread
// =============================================================================

fn run_dir_watcher(
    config: DirWatchConfig,
    window_check: Arc<dyn WindowCheck>,
    tx: mpsc::Sender<ScanUpdate>,
    cancel: Arc<AtomicBool>,
) {
    let cancel_check = Duration::from_millis(CANCEL_CHECK_INTERVAL_MS);
    let sub_iters: u32 = u32::try_from(
        (config.scan_interval.as_millis() / cancel_check.as_millis())
            .max(1)
            .min(u128::from(u32::MAX)),
    )
    .unwrap_or(u32::MAX);

    loop {
        if cancel.load(Ordering::Relaxed) {
            return;
        }

        let update = scan_once(&config, window_check.as_ref());
        tracing::trace!(
            identities = update.identities.len(),
            groups = update.groups.len(),
            "Rescan complete"
        );
        if tx.send(update).is_err() {
            tracing::debug!("Directory watcher: receiver dropped, exiting");
            return;
        }

        for _ in 0..sub_iters {
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!("Directory watcher: cancel flag set, exiting");
                return;
            }
            std::thread::sleep(cancel_check);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
