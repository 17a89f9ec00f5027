// EveTranslator - app/manager.rs
//
// Top-level coordinator: owns the pipeline worker, both sessions, the
// directory watcher and the current selections.
//
// Registries are held as `Arc` snapshots and replaced whole on every scan.
// Selection rules are plain functions over a snapshot so they can be tested
// without threads or files:
//   - group channel: keep the selection while it is live, follow the same
//     listener into a newer back-to-back group, replace a vanished selection
//     with the most recent group when auto-switch is on;
//   - identity channel: follow the selected character into a new transcript
//     and report location changes.

use crate::app::dir_watcher::{scan_once, DirWatchConfig, DirWatcher, ScanUpdate};
use crate::app::discovery::{
    latest_log_for_character, most_recent_fleet_file, most_recent_local,
};
use crate::app::pipeline::{MessagePipeline, PipelineWorker, WorkItem};
use crate::app::session::{SessionController, SessionRunner};
use crate::app::state_store::{self, SelectionState};
use crate::app::translator::{load_ignore_patterns, TranslationService};
use crate::core::detector::{LanguageDetector, WhatlangDetector};
use crate::core::discovery::{most_recent, parse_local_character_id};
use crate::core::model::{
    AppEvent, GroupRegistry, IdentityInfo, IdentityRegistry, SessionKind,
};
use crate::platform::config::{AppConfig, PlatformPaths};
use crate::platform::window::{SystemWindowCheck, WindowCheck};
use crate::util::constants::{EVENT_WAIT_MS, MAX_SCANS_PER_POLL};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// =============================================================================
// Selection rules
// =============================================================================

/// What to do with the group selection after a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetDecision {
    Keep,
    SwitchTo(String),
    Clear,
}

/// Apply the group selection rules to a fresh registry.
pub fn decide_fleet(
    registry: &GroupRegistry,
    selected: Option<&str>,
    auto_switch: bool,
    session_running: bool,
) -> FleetDecision {
    let newest = most_recent(registry);

    let Some(selected) = selected else {
        return match newest {
            Some(g) if session_running => FleetDecision::SwitchTo(g.fleet_id.clone()),
            _ => FleetDecision::Keep,
        };
    };

    match registry.get(selected) {
        Some(current) => match newest {
            // Same listener started a newer group while the old one is still
            // within the activity window.
            Some(g)
                if auto_switch
                    && g.fleet_id != current.fleet_id
                    && g.listener_name == current.listener_name
                    && g.created_time > current.created_time =>
            {
                FleetDecision::SwitchTo(g.fleet_id.clone())
            }
            _ => FleetDecision::Keep,
        },
        None => match newest {
            Some(g) if auto_switch => FleetDecision::SwitchTo(g.fleet_id.clone()),
            _ => FleetDecision::Clear,
        },
    }
}

/// How the selected character changed between two scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityDelta {
    /// The newest transcript is a different file (client restarted).
    pub log_changed: bool,
    /// The last recorded location differs.
    pub system_changed: bool,
}

pub fn identity_delta(old: Option<&IdentityInfo>, new: Option<&IdentityInfo>) -> IdentityDelta {
    match (old, new) {
        (Some(old), Some(new)) => IdentityDelta {
            log_changed: old.latest_log_path != new.latest_log_path,
            system_changed: old.system_name != new.system_name,
        },
        _ => IdentityDelta::default(),
    }
}

// =============================================================================
// Manager
// =============================================================================

pub struct TranslatorManager {
    config: AppConfig,
    paths: PlatformPaths,
    worker: PipelineWorker,
    fleet: SessionRunner,
    local: SessionRunner,
    watcher: DirWatcher,
    window_check: Arc<dyn WindowCheck>,
    identities: Arc<IdentityRegistry>,
    groups: Arc<GroupRegistry>,
    selected_character: Option<String>,
    selected_fleet: Option<String>,
    events: mpsc::Sender<AppEvent>,
}

impl TranslatorManager {
    /// Build a manager with the real detector, providers and window check.
    pub fn from_config(
        config: AppConfig,
        paths: PlatformPaths,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        let pipeline = build_pipeline(&config, &paths);
        Self::new(config, paths, pipeline, Arc::new(SystemWindowCheck), events)
    }

    /// Build a manager around an existing pipeline. Nothing runs until
    /// `start`.
    pub fn new(
        config: AppConfig,
        paths: PlatformPaths,
        pipeline: MessagePipeline,
        window_check: Arc<dyn WindowCheck>,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        let worker = PipelineWorker::spawn(pipeline, events.clone());
        let session = |kind| {
            SessionRunner::new(SessionController::new(
                kind,
                config.session_config(),
                worker.sender(),
                events.clone(),
            ))
        };
        let fleet = session(SessionKind::Fleet);
        let local = session(SessionKind::Local);

        // Explicit config selections win over the remembered ones.
        let remembered = state_store::load(&state_store::selection_path(&paths.data_dir))
            .unwrap_or_default();
        let selected_character = config.character_id.clone().or(remembered.character_id);
        let selected_fleet = config.fleet_id.clone().or(remembered.fleet_id);

        Self {
            config,
            paths,
            worker,
            fleet,
            local,
            watcher: DirWatcher::new(),
            window_check,
            identities: Arc::new(IdentityRegistry::new()),
            groups: Arc::new(GroupRegistry::new()),
            selected_character,
            selected_fleet,
            events,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn identities(&self) -> Arc<IdentityRegistry> {
        Arc::clone(&self.identities)
    }

    pub fn groups(&self) -> Arc<GroupRegistry> {
        Arc::clone(&self.groups)
    }

    pub fn selected_character(&self) -> Option<&str> {
        self.selected_character.as_deref()
    }

    pub fn selected_fleet(&self) -> Option<&str> {
        self.selected_fleet.as_deref()
    }

    pub fn is_session_running(&self, kind: SessionKind) -> bool {
        self.runner(kind).is_running()
    }

    /// Transcript a session is tailing, if it runs.
    pub fn session_path(&self, kind: SessionKind) -> Option<PathBuf> {
        self.runner(kind).current_path()
    }

    fn runner(&self, kind: SessionKind) -> &SessionRunner {
        match kind {
            SessionKind::Fleet => &self.fleet,
            SessionKind::Local => &self.local,
        }
    }

    fn runner_mut(&mut self, kind: SessionKind) -> &mut SessionRunner {
        match kind {
            SessionKind::Fleet => &mut self.fleet,
            SessionKind::Local => &mut self.local,
        }
    }

    fn watch_config(&self) -> DirWatchConfig {
        DirWatchConfig {
            log_dir: self.config.log_dir.clone(),
            scan_interval: self.config.scan_interval,
            fleet_inactive_threshold_secs: self.config.fleet_inactive_threshold_secs,
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Scan once, start the enabled sessions, then begin periodic rescans.
    pub fn start(&mut self) {
        let initial = scan_once(&self.watch_config(), self.window_check.as_ref());
        self.apply_scan(initial);

        if self.config.fleet_enabled {
            self.start_session(SessionKind::Fleet);
        }
        if self.config.local_enabled {
            self.start_session(SessionKind::Local);
        }

        self.watcher
            .start_watch(self.watch_config(), Arc::clone(&self.window_check));
        tracing::info!(dir = %self.config.log_dir.display(), "Translator started");
    }

    /// Apply any scans the watcher has finished. Returns how many.
    pub fn poll(&mut self) -> usize {
        let updates = self.watcher.poll_progress(MAX_SCANS_PER_POLL);
        let count = updates.len();
        for update in updates {
            self.apply_scan(update);
        }
        count
    }

    /// Stop everything. Queued lines are still processed.
    pub fn shutdown(&mut self) {
        self.watcher.stop_watch();
        self.fleet.stop();
        self.local.stop();
        self.worker.shutdown();
        tracing::info!("Translator stopped");
    }

    /// Apply scans and hand every event to `on_event` until `running` is
    /// cleared, then shut down and deliver whatever the worker still
    /// produced.
    pub fn run_until(
        &mut self,
        events: &mpsc::Receiver<AppEvent>,
        running: &AtomicBool,
        mut on_event: impl FnMut(AppEvent),
    ) {
        let wait = Duration::from_millis(EVENT_WAIT_MS);
        while running.load(Ordering::SeqCst) {
            self.poll();
            match events.recv_timeout(wait) {
                Ok(event) => {
                    on_event(event);
                    events.try_iter().for_each(&mut on_event);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        self.shutdown();
        events.try_iter().for_each(&mut on_event);
    }

    // -------------------------------------------------------------------------
    // Scans
    // -------------------------------------------------------------------------

    /// Swap in a completed scan and run the selection rules.
    pub fn apply_scan(&mut self, update: ScanUpdate) {
        self.apply_identities(update.identities);
        self.apply_groups(update.groups);
    }

    fn apply_identities(&mut self, registry: IdentityRegistry) {
        let new = Arc::new(registry);
        let old = std::mem::replace(&mut self.identities, Arc::clone(&new));

        if let Some(id) = self.selected_character.clone() {
            let delta = identity_delta(old.get(&id), new.get(&id));
            if let Some(info) = new.get(&id) {
                if delta.log_changed {
                    tracing::info!(character = %info.character_name, file = %info.latest_log_path.display(), "New transcript for selected character");
                    if self.local.is_running() {
                        self.local.switch_source(&info.latest_log_path);
                    }
                }
                if delta.system_changed {
                    tracing::info!(
                        character = %info.character_name,
                        from = ?old.get(&id).and_then(|o| o.system_name.as_deref()),
                        to = ?info.system_name,
                        "Location changed"
                    );
                }
            }
        }

        let _ = self.events.send(AppEvent::IdentitiesUpdated(new));
    }

    fn apply_groups(&mut self, registry: GroupRegistry) {
        self.groups = Arc::new(registry);

        let decision = decide_fleet(
            &self.groups,
            self.selected_fleet.as_deref(),
            self.config.fleet_auto_switch,
            self.fleet.is_running(),
        );
        match decision {
            FleetDecision::Keep => {}
            FleetDecision::SwitchTo(id) => {
                tracing::info!(fleet = %id, "Following group channel");
                self.switch_fleet(&id);
            }
            FleetDecision::Clear => {
                tracing::info!("Selected group channel inactive; selection cleared");
                self.selected_fleet = None;
                self.persist_selection();
            }
        }

        let _ = self.events.send(AppEvent::GroupsUpdated {
            registry: Arc::clone(&self.groups),
            selected: self.selected_fleet.clone(),
        });
    }

    // -------------------------------------------------------------------------
    // Sessions and selection
    // -------------------------------------------------------------------------

    /// Resolve a transcript for `kind` and start tailing it.
    ///
    /// Returns `false` if the session already runs or no transcript exists.
    pub fn start_session(&mut self, kind: SessionKind) -> bool {
        if self.is_session_running(kind) {
            return false;
        }
        let path = match kind {
            SessionKind::Fleet => self.resolve_fleet_path(),
            SessionKind::Local => self.resolve_local_path(),
        };
        let Some(path) = path else {
            tracing::warn!(session = %kind, dir = %self.config.log_dir.display(), "No transcript found; session not started");
            return false;
        };
        self.runner_mut(kind).start(&path)
    }

    pub fn stop_session(&mut self, kind: SessionKind) {
        self.runner_mut(kind).stop();
    }

    pub fn toggle_session(&mut self, kind: SessionKind) -> bool {
        if self.is_session_running(kind) {
            self.stop_session(kind);
            false
        } else {
            self.start_session(kind)
        }
    }

    /// Track a different character. Unknown ids are ignored.
    pub fn switch_character(&mut self, character_id: &str) -> bool {
        let Some(info) = self.identities.get(character_id) else {
            tracing::warn!(character = character_id, "Unknown character id");
            return false;
        };
        let path = info.latest_log_path.clone();
        tracing::info!(character = %info.character_name, "Switching character");

        self.selected_character = Some(character_id.to_string());
        self.persist_selection();
        if self.local.is_running() {
            self.local.switch_source(&path);
        }
        true
    }

    /// Track a different group channel. Unknown ids are ignored.
    pub fn switch_fleet(&mut self, fleet_id: &str) -> bool {
        let Some(info) = self.groups.get(fleet_id) else {
            tracing::warn!(fleet = fleet_id, "Unknown group id");
            return false;
        };
        let path = info.log_path.clone();
        tracing::info!(listener = %info.listener_name, "Switching group channel");

        self.selected_fleet = Some(fleet_id.to_string());
        self.persist_selection();
        if self.fleet.is_running() {
            self.fleet.switch_source(&path);
        }
        true
    }

    /// Group session: selected group, else the most recent one (selected as
    /// a side effect), else the newest `Fleet_*` file on disk.
    fn resolve_fleet_path(&mut self) -> Option<PathBuf> {
        if let Some(info) = self
            .selected_fleet
            .as_deref()
            .and_then(|id| self.groups.get(id))
        {
            return Some(info.log_path.clone());
        }
        if let Some(info) = most_recent(&self.groups) {
            let (id, path) = (info.fleet_id.clone(), info.log_path.clone());
            tracing::info!(fleet = %id, "Auto-selected most recent group channel");
            self.selected_fleet = Some(id);
            self.persist_selection();
            return Some(path);
        }
        most_recent_fleet_file(&self.config.log_dir)
    }

    /// Identity session: newest transcript of the selected character, else
    /// the newest identity transcript of anyone.
    fn resolve_local_path(&mut self) -> Option<PathBuf> {
        if let Some(id) = self.selected_character.as_deref() {
            match latest_log_for_character(&self.config.log_dir, id) {
                Some(path) => return Some(path),
                None => tracing::warn!(character = id, "No transcript for selected character"),
            }
        }

        let path = most_recent_local(&self.config.log_dir)?;
        if self.selected_character.is_none() {
            let id = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_local_character_id)
                .filter(|id| self.identities.contains(id));
            if let Some(id) = id {
                tracing::info!(character = %id, "Auto-selected character");
                self.selected_character = Some(id);
                self.persist_selection();
            }
        }
        Some(path)
    }

    fn persist_selection(&self) {
        let state = SelectionState::new(self.selected_character.clone(), self.selected_fleet.clone());
        let path = state_store::selection_path(&self.paths.data_dir);
        if let Err(e) = state_store::save(&state, &path) {
            tracing::warn!(error = %e, "Cannot save selection");
        }
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Apply a new configuration to the worker, sessions and watcher.
    pub fn update_config(&mut self, config: AppConfig) {
        let pipeline_changed = config.pipeline_config() != self.config.pipeline_config();
        let watch_changed = config.log_dir != self.config.log_dir
            || config.scan_interval != self.config.scan_interval
            || config.fleet_inactive_threshold_secs != self.config.fleet_inactive_threshold_secs;

        if pipeline_changed
            && self
                .worker
                .sender()
                .send(WorkItem::Reconfigure(config.pipeline_config()))
                .is_err()
        {
            tracing::warn!("Pipeline worker gone; configuration not applied");
        }

        self.fleet.set_config(config.session_config());
        self.local.set_config(config.session_config());
        self.config = config;

        if watch_changed && self.watcher.is_active() {
            self.watcher
                .start_watch(self.watch_config(), Arc::clone(&self.window_check));
        }
        tracing::info!(pipeline_changed, watch_changed, "Configuration updated");
    }
}

impl Drop for TranslatorManager {
    fn drop(&mut self) {
        self.watcher.stop_watch();
        self.fleet.stop();
        self.local.stop();
    }
}

/// Detector, translator and tables for a live run.
pub fn build_pipeline(config: &AppConfig, paths: &PlatformPaths) -> MessagePipeline {
    let detector = LanguageDetector::new(load_ignore_patterns(paths), Arc::new(WhatlangDetector));
    let translator = TranslationService::new(paths.clone(), config.pipeline_config());
    MessagePipeline::new(detector, translator, config.pipeline_config())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::GroupInfo;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_765_000_000 + secs, 0).single().expect("valid time")
    }

    fn group(id: &str, listener: &str, created: i64) -> GroupInfo {
        GroupInfo {
            fleet_id: id.to_string(),
            listener_name: listener.to_string(),
            log_path: PathBuf::from(id),
            log_mtime: at(created),
            created_time: at(created),
            is_active: true,
        }
    }

    fn identity(path: &str, system: Option<&str>) -> IdentityInfo {
        IdentityInfo {
            character_id: "1".to_string(),
            character_name: "Pilot".to_string(),
            latest_log_path: PathBuf::from(path),
            log_mtime: at(0),
            system_name: system.map(str::to_string),
            is_active: true,
        }
    }

    #[test]
    fn test_no_selection_picks_most_recent_when_running() {
        let reg: GroupRegistry = [group("a", "Eric", 0), group("b", "Ann", 60)].into_iter().collect();
        assert_eq!(decide_fleet(&reg, None, true, true), FleetDecision::SwitchTo("b".into()));
        assert_eq!(decide_fleet(&reg, None, true, false), FleetDecision::Keep, "stopped sessions do not auto-select");
        assert_eq!(decide_fleet(&GroupRegistry::new(), None, true, true), FleetDecision::Keep);
    }

    /// A newer group from the same listener replaces the current one.
    #[test]
    fn test_back_to_back_same_listener() {
        let reg: GroupRegistry = [group("a", "Eric", 0), group("b", "Eric", 60)].into_iter().collect();
        assert_eq!(decide_fleet(&reg, Some("a"), true, true), FleetDecision::SwitchTo("b".into()));
        assert_eq!(decide_fleet(&reg, Some("a"), false, true), FleetDecision::Keep);
        assert_eq!(decide_fleet(&reg, Some("b"), true, true), FleetDecision::Keep);
    }

    #[test]
    fn test_newer_group_other_listener_kept() {
        let reg: GroupRegistry = [group("a", "Eric", 0), group("b", "Ann", 60)].into_iter().collect();
        assert_eq!(decide_fleet(&reg, Some("a"), true, true), FleetDecision::Keep);
    }

    #[test]
    fn test_vanished_selection() {
        let reg: GroupRegistry = [group("b", "Ann", 60)].into_iter().collect();
        assert_eq!(decide_fleet(&reg, Some("gone"), true, true), FleetDecision::SwitchTo("b".into()));
        assert_eq!(decide_fleet(&reg, Some("gone"), false, true), FleetDecision::Clear);
        assert_eq!(decide_fleet(&GroupRegistry::new(), Some("gone"), true, true), FleetDecision::Clear);
    }

    /// Equal creation times resolve to the first group found.
    #[test]
    fn test_tie_first_found_wins() {
        let reg: GroupRegistry = [group("a", "Eric", 60), group("b", "Ann", 60)].into_iter().collect();
        assert_eq!(decide_fleet(&reg, None, true, true), FleetDecision::SwitchTo("a".into()));
    }

    #[test]
    fn test_identity_delta() {
        let old = identity("Local_1.txt", Some("Jita"));
        let moved = identity("Local_1.txt", Some("Amarr"));
        let restarted = identity("Local_2.txt", Some("Jita"));

        assert_eq!(
            identity_delta(Some(&old), Some(&moved)),
            IdentityDelta { log_changed: false, system_changed: true }
        );
        assert_eq!(
            identity_delta(Some(&old), Some(&restarted)),
            IdentityDelta { log_changed: true, system_changed: false }
        );
        assert_eq!(identity_delta(None, Some(&old)), IdentityDelta::default());
    }

    /// Manager over an empty log directory with both sessions disabled.
    fn idle_manager(root: &std::path::Path) -> (TranslatorManager, mpsc::Receiver<AppEvent>) {
        let logs = root.join("logs");
        std::fs::create_dir_all(&logs).expect("mkdir");
        let paths = PlatformPaths {
            config_dir: root.join("config"),
            user_glossary_dir: root.join("config").join("glossaries"),
            data_dir: root.join("data"),
            resource_dir: root.join("assets"),
            default_log_dir: logs.clone(),
        };
        let mut config = AppConfig::with_log_dir(logs);
        config.mock_provider = true;
        config.fleet_enabled = false;
        config.local_enabled = false;
        config.scan_interval = Duration::from_millis(100);

        let pipeline = build_pipeline(&config, &paths);
        let (tx, rx) = mpsc::channel();
        let manager = TranslatorManager::new(
            config,
            paths,
            pipeline,
            Arc::new(crate::platform::window::NoWindowCheck),
            tx,
        );
        (manager, rx)
    }

    /// A backlog of finished scans is applied a few at a time.
    #[test]
    fn test_poll_applies_bounded_scans() {
        let root = tempfile::tempdir().expect("tempdir");
        let (mut manager, _rx) = idle_manager(root.path());
        manager.start();
        std::thread::sleep(Duration::from_millis(1_500));

        assert_eq!(manager.poll(), MAX_SCANS_PER_POLL, "backlog is applied in bounded steps");
        assert!(manager.poll() > 0, "the rest stays queued for the next poll");
        manager.shutdown();
    }

    /// Clearing the running flag ends the loop with an orderly shutdown.
    #[test]
    fn test_run_until_stops_when_flag_cleared() {
        let root = tempfile::tempdir().expect("tempdir");
        let (mut manager, rx) = idle_manager(root.path());
        manager.start();

        let running = Arc::new(AtomicBool::new(true));
        let stopper = {
            let running = Arc::clone(&running);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(300));
                running.store(false, Ordering::SeqCst);
            })
        };

        let mut scans_seen = 0;
        manager.run_until(&rx, &running, |event| {
            if matches!(event, AppEvent::GroupsUpdated { .. }) {
                scans_seen += 1;
            }
        });
        stopper.join().expect("stopper thread");

        assert!(scans_seen > 0, "events are delivered while running");
        assert!(!manager.watcher.is_active(), "watcher stopped on exit");
        assert!(!manager.is_session_running(SessionKind::Fleet));
        assert!(!manager.is_session_running(SessionKind::Local));
    }
}
