// EveTranslator - tests/e2e_discovery.rs
//
// End-to-end tests for transcript discovery and tailing.
//
// These tests write real UTF-16LE transcripts into a temporary directory,
// set real modification times and read them back through the public API.
// No mocks: walkdir traversal, header parsing and the tailer all touch the
// file system.

use chrono::Utc;
use eve_translator::app::discovery::{
    latest_log_for_character, most_recent_fleet_file, scan_characters, scan_fleets,
};
use eve_translator::app::tail::LogTailer;
use eve_translator::core::discovery::most_recent;
use eve_translator::platform::fs::{encode_utf16le, UTF16LE_BOM};
use eve_translator::platform::window::NoWindowCheck;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

// =============================================================================
// Helpers
// =============================================================================

const RULE: &str = "  ---------------------------------------------------------------";

/// Write a transcript the way the game client does: BOM, header block, body.
fn transcript(dir: &Path, name: &str, listener: &str, body: &[&str], age_secs: u64) -> PathBuf {
    let mut text = format!(
        "\r\n\r\n{RULE}\r\n\r\n  Channel ID:      local\r\n  Channel Name:    Local\r\n  Listener:        {listener}\r\n  Session started: 2025.12.16 08:24:57\r\n{RULE}\r\n\r\n"
    );
    for line in body {
        text.push_str(line);
        text.push_str("\r\n");
    }
    let mut bytes = UTF16LE_BOM.to_vec();
    bytes.extend(encode_utf16le(&text));
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write transcript");
    set_age(&path, age_secs);
    path
}

fn set_age(path: &Path, age_secs: u64) {
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    std::fs::File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(mtime))
        .expect("set mtime");
}

fn append(path: &Path, lines: &[&str]) {
    let mut f = std::fs::OpenOptions::new().append(true).open(path).expect("open");
    for line in lines {
        f.write_all(&encode_utf16le(&format!("{line}\r\n"))).expect("append");
    }
}

// =============================================================================
// Discovery E2E
// =============================================================================

/// A group transcript older than the threshold is absent; a fresh one is
/// present and active.
#[test]
fn e2e_group_activity_threshold() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fresh = transcript(dir.path(), "Fleet_20251216_082457.txt", "Eric Atlantis", &[], 120);
    transcript(dir.path(), "Fleet_20251215_082457.txt", "Eric Atlantis", &[], 3_600);

    let registry = scan_fleets(dir.path(), 1_800, Utc::now());
    assert_eq!(registry.len(), 1, "stale group must be excluded");
    let group = registry
        .get(&fresh.to_string_lossy())
        .expect("fresh group keyed by path");
    assert!(group.is_active);
    assert_eq!(group.listener_name, "Eric Atlantis");
}

/// Back-to-back groups: the newer file name wins `most_recent`.
#[test]
fn e2e_most_recent_group_by_creation() {
    let dir = tempfile::tempdir().expect("tempdir");
    transcript(dir.path(), "Fleet_20251216_080000.txt", "Eric", &[], 30);
    let newer = transcript(dir.path(), "Fleet_20251216_090000_77.txt", "Eric", &[], 600);

    let registry = scan_fleets(dir.path(), 1_800, Utc::now());
    let pick = most_recent(&registry).expect("two active groups");
    assert_eq!(pick.log_path, newer, "creation time, not mtime, decides");
    assert_eq!(
        most_recent_fleet_file(dir.path()),
        Some(dir.path().join("Fleet_20251216_080000.txt")),
        "newest by modification time"
    );
}

/// The last location change in the whole file wins.
#[test]
fn e2e_identity_last_location() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = [
        "[ 2025.12.16 08:25:00 ] EVE System > Channel changed to Local : Jita",
        "[ 2025.12.16 08:30:00 ] Someone > o7",
        "[ 2025.12.16 08:40:00 ] EVE System > Channel changed to Local : Perimeter",
        "[ 2025.12.16 08:41:00 ] Someone > hello",
    ];
    let path = transcript(dir.path(), "Local_20251216_082457_95465499.txt", "Eric Atlantis", &body, 10);

    let registry = scan_characters(dir.path(), &NoWindowCheck, Utc::now());
    let info = registry.get("95465499").expect("character discovered");
    assert_eq!(info.character_name, "Eric Atlantis");
    assert_eq!(info.system_name.as_deref(), Some("Perimeter"));
    assert!(info.is_active);
    assert_eq!(latest_log_for_character(dir.path(), "95465499"), Some(path));
}

// =============================================================================
// Tailer E2E
// =============================================================================

/// N lines written after seek-to-end come back exactly once.
#[test]
fn e2e_tailer_returns_new_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = transcript(dir.path(), "Local_20251216_082457_1.txt", "Eric", &["[ 2025.12.16 08:25:00 ] A > before"], 0);

    let mut tailer = LogTailer::open(&path);
    tailer.seek_to_end();
    let lines = [
        "[ 2025.12.16 08:26:00 ] A > one",
        "[ 2025.12.16 08:26:01 ] B > 吉他收脑插",
        "[ 2025.12.16 08:26:02 ] C > three",
    ];
    append(&path, &lines);

    assert_eq!(tailer.read_new_lines(), lines);
    assert!(tailer.read_new_lines().is_empty());
}

/// Truncation below the cursor reopens from the start without an error.
#[test]
fn e2e_tailer_survives_rotation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body: Vec<String> = (0..20)
        .map(|i| format!("[ 2025.12.16 08:26:{i:02} ] A > padding line {i}"))
        .collect();
    let body_refs: Vec<&str> = body.iter().map(String::as_str).collect();
    let path = transcript(dir.path(), "Fleet_20251216_082457.txt", "Eric", &body_refs, 0);

    let mut tailer = LogTailer::open(&path);
    tailer.seek_to_end();

    let mut bytes = UTF16LE_BOM.to_vec();
    bytes.extend(encode_utf16le("[ 2025.12.16 09:00:00 ] A > fresh start\r\n"));
    std::fs::write(&path, bytes).expect("rotate");

    let lines = tailer.read_new_lines();
    assert!(
        lines.iter().any(|l| l == "[ 2025.12.16 09:00:00 ] A > fresh start"),
        "new line must be returned after rotation, got {lines:?}"
    );
}

/// History backfill returns only message lines, newest last.
#[test]
fn e2e_history_backfill() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = [
        "[ 2025.12.16 08:25:00 ] A > first",
        "[ 2025.12.16 08:25:01 ] B > second",
        "[ 2025.12.16 08:25:02 ] C > third",
    ];
    let path = transcript(dir.path(), "Local_20251216_082457_1.txt", "Eric", &body, 0);

    let tailer = LogTailer::open(&path);
    assert_eq!(tailer.read_last_n_lines(2), &body[1..]);
    assert_eq!(tailer.read_last_n_lines(10), body, "header lines are never returned");
}
