// EveTranslator - tests/e2e_pipeline.rs
//
// End-to-end tests for the message pipeline and the manager.
//
// The bundled glossary and ignore tables under assets/ are loaded from disk
// and the offline mock provider stands in for the network. Manager tests
// run real session and watcher threads against a temporary chat-log
// directory.

use eve_translator::app::manager::{build_pipeline, TranslatorManager};
use eve_translator::app::state_store;
use eve_translator::app::translator::{load_glossary, load_ignore_patterns};
use eve_translator::core::model::{AppEvent, SessionKind};
use eve_translator::platform::config::{AppConfig, PlatformPaths};
use eve_translator::platform::fs::{encode_utf16le, UTF16LE_BOM};
use eve_translator::platform::window::NoWindowCheck;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

fn paths(root: &Path) -> PlatformPaths {
    PlatformPaths {
        config_dir: root.join("config"),
        user_glossary_dir: root.join("config").join("glossaries"),
        data_dir: root.join("data"),
        resource_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"),
        default_log_dir: root.join("logs"),
    }
}

fn config(log_dir: &Path) -> AppConfig {
    let mut config = AppConfig::with_log_dir(log_dir.to_path_buf());
    config.mock_provider = true;
    config.polling_interval = Duration::from_millis(50);
    config.scan_interval = Duration::from_secs(1);
    config
}

fn transcript(dir: &Path, name: &str, listener: &str, body: &[&str]) -> PathBuf {
    let mut text = format!("\r\n  Channel Name:    Local\r\n  Listener:        {listener}\r\n\r\n");
    for line in body {
        text.push_str(line);
        text.push_str("\r\n");
    }
    let mut bytes = UTF16LE_BOM.to_vec();
    bytes.extend(encode_utf16le(&text));
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write transcript");
    path
}

fn append(path: &Path, line: &str) {
    let mut f = std::fs::OpenOptions::new().append(true).open(path).expect("open");
    f.write_all(&encode_utf16le(&format!("{line}\r\n"))).expect("append");
}

/// Next `MessageReady` as (text, original, is_translated), skipping other
/// events. Gives up after five seconds.
fn next_message(rx: &mpsc::Receiver<AppEvent>) -> Option<(String, String, bool)> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(AppEvent::MessageReady { text, original, is_translated, .. }) => {
                return Some((text, original, is_translated))
            }
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

// =============================================================================
// Bundled tables
// =============================================================================

#[test]
fn e2e_bundled_glossary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let glossary = load_glossary(&paths(dir.path()), "zh", "en");

    let out = glossary.replace_terms("吉他收脑插");
    assert!(out.contains("Jita") && out.contains("WTB"), "got {out}");
    assert!(glossary.replace_terms("毒蜥").contains("Gila"));
    assert!(glossary.replace_terms("1600").contains("1600mm Plate"));
    assert_eq!(glossary.replace_terms("Hello World"), "Hello World");
    assert!(glossary.get("source_lang").is_none(), "meta is not a term");
}

#[test]
fn e2e_bundled_ignore_patterns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let patterns = load_ignore_patterns(&paths(dir.path()));
    assert!(patterns.matches("WTS Drake blueprint"));
    assert!(patterns.matches("o7"));
    assert!(!patterns.matches("Guten Morgen zusammen"));
}

/// Replay path: bundled tables plus the mock provider.
#[test]
fn e2e_pipeline_translates_cjk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(dir.path());
    let pipeline = build_pipeline(&cfg, &paths(dir.path()));

    let event = pipeline
        .process_line(SessionKind::Fleet, "[ 2025.12.16 08:38:43 ] Eric Atlantis > 吉他收\x1A脑插\x1A")
        .expect("chat line");
    let AppEvent::MessageReady { text, original, is_translated, sender, .. } = event else {
        panic!("expected MessageReady");
    };
    assert_eq!(sender, "Eric Atlantis");
    assert!(is_translated);
    assert!(text.starts_with("[MOCK] Jita WTB"), "got {text}");
    assert!(text.contains('\x1A'), "link spans are restored");
    assert_eq!(original, "吉他收\x1A脑插\x1A");
}

// =============================================================================
// Manager
// =============================================================================

/// The identity session auto-selects the only character, backfills its
/// history and forwards new lines.
#[test]
fn e2e_manager_local_session() {
    let root = tempfile::tempdir().expect("tempdir");
    let logs = root.path().join("logs");
    std::fs::create_dir_all(&logs).expect("mkdir");
    let log = transcript(
        &logs,
        "Local_20251216_082457_42.txt",
        "Eric Atlantis",
        &["[ 2025.12.16 08:30:00 ] Pilot > 跳跳跳"],
    );

    let mut cfg = config(&logs);
    cfg.fleet_enabled = false;
    let p = paths(root.path());
    let pipeline = build_pipeline(&cfg, &p);
    let (tx, rx) = mpsc::channel();
    let mut manager = TranslatorManager::new(cfg, p.clone(), pipeline, Arc::new(NoWindowCheck), tx);
    manager.start();

    assert!(manager.is_session_running(SessionKind::Local));
    assert!(!manager.is_session_running(SessionKind::Fleet));
    assert_eq!(manager.selected_character(), Some("42"));
    assert_eq!(manager.session_path(SessionKind::Local), Some(log.clone()));

    let (text, _, translated) = next_message(&rx).expect("history backfill");
    assert!(translated);
    assert!(text.starts_with("[MOCK]"), "got {text}");

    append(&log, "[ 2025.12.16 08:31:00 ] Pilot > 不要过门");
    let (text, original, _) = next_message(&rx).expect("tailed line");
    assert_eq!(text, "[MOCK] Do not jump");
    assert_eq!(original, "不要过门");

    manager.shutdown();
    assert!(!manager.is_session_running(SessionKind::Local));

    let saved = state_store::load(&state_store::selection_path(&p.data_dir)).expect("selection saved");
    assert_eq!(saved.character_id.as_deref(), Some("42"));
}

/// A remembered group is replaced by a newer group from the same listener.
#[test]
fn e2e_manager_follows_back_to_back_group() {
    let root = tempfile::tempdir().expect("tempdir");
    let logs = root.path().join("logs");
    std::fs::create_dir_all(&logs).expect("mkdir");
    let older = transcript(&logs, "Fleet_20251216_080000.txt", "Eric", &[]);
    let newer = transcript(&logs, "Fleet_20251216_090000.txt", "Eric", &[]);

    let mut cfg = config(&logs);
    cfg.local_enabled = false;
    cfg.fleet_id = Some(older.to_string_lossy().into_owned());
    let p = paths(root.path());
    let pipeline = build_pipeline(&cfg, &p);
    let (tx, _rx) = mpsc::channel();
    let mut manager = TranslatorManager::new(cfg, p, pipeline, Arc::new(NoWindowCheck), tx);
    manager.start();

    let newer_id = newer.to_string_lossy().into_owned();
    assert_eq!(manager.selected_fleet(), Some(newer_id.as_str()));
    assert_eq!(manager.session_path(SessionKind::Fleet), Some(newer));
    assert!(!manager.switch_fleet("no-such-group"), "unknown ids are ignored");
    assert_eq!(manager.selected_fleet(), Some(newer_id.as_str()));

    manager.shutdown();
}
