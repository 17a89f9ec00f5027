// EveTranslator - app/discovery.rs
//
// Directory scans that build the identity and group registries.
//
// Listing and name parsing live in core::discovery; this module reads
// transcript contents (headers, location changes) and assembles fresh
// registry snapshots. Header reads run in parallel with rayon because a
// long-lived chat-log directory holds thousands of transcripts.
//
// Every scan degrades to an empty registry when the directory cannot be
// read. Unreadable individual files are skipped.

use crate::core::discovery::{
    self, find_last_system, find_listener, is_recent, parse_fleet_created_time,
    parse_local_character_id, TranscriptFile,
};
use crate::core::model::{GroupInfo, GroupRegistry, IdentityInfo, IdentityRegistry};
use crate::platform::fs::{read_first_lines_utf16, read_utf16_file};
use crate::platform::window::WindowCheck;
use crate::util::constants;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// List transcripts matching `pattern`, logging rather than failing.
fn list_or_empty(dir: &Path, pattern: &str) -> Vec<TranscriptFile> {
    match discovery::list_transcripts(dir, pattern) {
        Ok((files, warnings)) => {
            for w in &warnings {
                tracing::debug!(warning = %w, "Discovery warning");
            }
            files
        }
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Chat log directory unavailable");
            Vec::new()
        }
    }
}

/// Listener name from a transcript header, or `None` if it has none or
/// cannot be read.
fn read_listener(path: &Path) -> Option<String> {
    match read_first_lines_utf16(path, constants::HEADER_SCAN_LINES) {
        Ok(lines) => find_listener(lines.iter().map(String::as_str)),
        Err(e) => {
            tracing::debug!(file = %path.display(), error = %e, "Cannot read transcript header");
            None
        }
    }
}

/// Most recent location change anywhere in the transcript.
fn read_last_system(path: &Path) -> Option<String> {
    match read_utf16_file(path) {
        Ok(text) => find_last_system(text.lines()),
        Err(e) => {
            tracing::debug!(file = %path.display(), error = %e, "Cannot read transcript body");
            None
        }
    }
}

// =============================================================================
// Group channels
// =============================================================================

/// Scan for group transcripts written within `inactive_threshold_secs` of
/// `now`.
///
/// Inactive transcripts and transcripts without a `Listener:` header are
/// left out entirely. Registry order follows file path order.
pub fn scan_fleets(dir: &Path, inactive_threshold_secs: u64, now: DateTime<Utc>) -> GroupRegistry {
    let files = list_or_empty(dir, constants::FLEET_FILE_GLOB);
    let total = files.len();

    let groups: Vec<GroupInfo> = files
        .into_par_iter()
        .filter_map(|file| {
            let mtime = file.modified?;
            if !is_recent(mtime, now, inactive_threshold_secs) {
                return None;
            }
            let Some(listener_name) = read_listener(&file.path) else {
                tracing::debug!(file = %file.file_name, "No listener in group transcript header");
                return None;
            };
            let created_time = parse_fleet_created_time(&file.file_name)
                .or(file.created)
                .unwrap_or(mtime);

            Some(GroupInfo {
                fleet_id: file.path.to_string_lossy().into_owned(),
                listener_name,
                log_path: file.path,
                log_mtime: mtime,
                created_time,
                is_active: true,
            })
        })
        .collect();

    tracing::debug!(
        dir = %dir.display(),
        files = total,
        active = groups.len(),
        "Group scan complete"
    );
    groups.into_iter().collect()
}

/// Newest `Fleet_*.txt` by modification time, active or not.
pub fn most_recent_fleet_file(dir: &Path) -> Option<PathBuf> {
    newest(list_or_empty(dir, constants::FLEET_FILE_GLOB))
}

// =============================================================================
// Identity channels
// =============================================================================

/// Scan identity transcripts, one entry per character.
///
/// Each character is represented by its most recently written transcript.
/// The display name comes from the newest file with a `Listener:` header;
/// the location from the last change recorded in the newest file.
pub fn scan_characters(dir: &Path, window_check: &dyn WindowCheck, now: DateTime<Utc>) -> IdentityRegistry {
    let mut by_character: BTreeMap<String, Vec<(PathBuf, DateTime<Utc>)>> = BTreeMap::new();
    for file in list_or_empty(dir, constants::LOCAL_FILE_GLOB) {
        let (Some(id), Some(mtime)) = (parse_local_character_id(&file.file_name), file.modified)
        else {
            continue;
        };
        by_character.entry(id).or_default().push((file.path, mtime));
    }

    let identities: Vec<IdentityInfo> = by_character
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .filter_map(|(character_id, mut logs)| {
            logs.sort_by(|a, b| b.1.cmp(&a.1));
            let (latest_path, latest_mtime) = logs.first().cloned()?;

            let character_name = logs
                .iter()
                .find_map(|(path, _)| read_listener(path))
                .unwrap_or_else(|| format!("{}{character_id}", constants::UNKNOWN_CHARACTER_PREFIX));
            let system_name = read_last_system(&latest_path);

            let recently_written =
                is_recent(latest_mtime, now, constants::LOCAL_ACTIVE_WINDOW_SECS);
            let is_active = recently_written || window_check.is_client_window_open(&character_name);

            Some(IdentityInfo {
                character_id,
                character_name,
                latest_log_path: latest_path,
                log_mtime: latest_mtime,
                system_name,
                is_active,
            })
        })
        .collect();

    tracing::debug!(
        dir = %dir.display(),
        characters = identities.len(),
        active = identities.iter().filter(|i| i.is_active).count(),
        "Identity scan complete"
    );
    identities.into_iter().collect()
}

/// Newest identity transcript for one character.
pub fn latest_log_for_character(dir: &Path, character_id: &str) -> Option<PathBuf> {
    newest(
        list_or_empty(dir, constants::LOCAL_FILE_GLOB)
            .into_iter()
            .filter(|f| parse_local_character_id(&f.file_name).as_deref() == Some(character_id)),
    )
}

/// Newest identity transcript of any character.
pub fn most_recent_local(dir: &Path) -> Option<PathBuf> {
    newest(list_or_empty(dir, constants::LOCAL_FILE_GLOB))
}

/// Path of the file with the latest modification time; the first one wins
/// on ties.
fn newest(files: impl IntoIterator<Item = TranscriptFile>) -> Option<PathBuf> {
    files
        .into_iter()
        .filter_map(|f| f.modified.map(|m| (m, f.path)))
        .fold(None, |best: Option<(DateTime<Utc>, PathBuf)>, (m, p)| match best {
            Some((bm, bp)) if bm >= m => Some((bm, bp)),
            _ => Some((m, p)),
        })
        .map(|(_, p)| p)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fs::{encode_utf16le, UTF16LE_BOM};
    use crate::platform::window::NoWindowCheck;
    use std::time::{Duration, SystemTime};

    struct OpenWindows(Vec<&'static str>);

    impl WindowCheck for OpenWindows {
        fn is_client_window_open(&self, name: &str) -> bool {
            self.0.contains(&name)
        }
    }

    fn write_transcript(dir: &Path, name: &str, listener: Option<&str>, body: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let mut text = String::from("\r\n  ---------------------------------------------------------------\r\n");
        text.push_str("  Channel Name:    Test\r\n");
        if let Some(l) = listener {
            text.push_str(&format!("  Listener:        {l}\r\n"));
        }
        text.push_str("  ---------------------------------------------------------------\r\n");
        text.push_str(body);
        let mut bytes = UTF16LE_BOM.to_vec();
        bytes.extend(encode_utf16le(&text));
        std::fs::write(&path, bytes).expect("write transcript");

        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(mtime))
            .expect("set mtime");
        path
    }

    #[test]
    fn test_scan_fleets_excludes_inactive_and_headerless() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_transcript(dir.path(), "Fleet_20251216_082457.txt", Some("Eric"), "", 60);
        write_transcript(dir.path(), "Fleet_20251215_082457.txt", Some("Old"), "", 7200);
        write_transcript(dir.path(), "Fleet_20251216_090000.txt", None, "", 60);

        let registry = scan_fleets(dir.path(), 1800, Utc::now());
        assert_eq!(registry.len(), 1, "only the fresh transcript with a listener");
        let g = registry.iter().next().expect("one group");
        assert_eq!(g.listener_name, "Eric");
        assert!(g.is_active);
        assert_eq!(g.fleet_id, g.log_path.to_string_lossy());
        assert_eq!(
            Some(g.created_time),
            parse_fleet_created_time("Fleet_20251216_082457.txt")
        );
    }

    #[test]
    fn test_scan_characters_groups_by_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = "[ 2025.12.16 10:00:00 ] EVE System > Channel changed to Local : Jita\r\n\
                    [ 2025.12.16 11:00:00 ] EVE System > Channel changed to Local : Amarr\r\n";
        write_transcript(dir.path(), "Local_20251215_100000_111.txt", Some("Pilot One"), "", 9000);
        let newest = write_transcript(dir.path(), "Local_20251216_100000_111.txt", None, body, 30);
        write_transcript(dir.path(), "Local_20251216_100000_222.txt", None, "", 9000);

        let registry = scan_characters(dir.path(), &NoWindowCheck, Utc::now());
        assert_eq!(registry.len(), 2);

        let one = registry.get("111").expect("character 111");
        assert_eq!(one.latest_log_path, newest);
        assert_eq!(one.character_name, "Pilot One", "name falls back to older transcripts");
        assert_eq!(one.system_name.as_deref(), Some("Amarr"));
        assert!(one.is_active);

        let two = registry.get("222").expect("character 222");
        assert_eq!(two.character_name, "Character_222");
        assert!(!two.is_active);
        assert!(two.system_name.is_none());
    }

    /// An open client window keeps a quiet character active.
    #[test]
    fn test_open_window_marks_active() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_transcript(dir.path(), "Local_20251216_100000_333.txt", Some("Idle Pilot"), "", 9000);
        let registry = scan_characters(dir.path(), &OpenWindows(vec!["Idle Pilot"]), Utc::now());
        assert!(registry.get("333").expect("character 333").is_active);
    }

    #[test]
    fn test_latest_and_most_recent_queries() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_transcript(dir.path(), "Local_20251215_100000_111.txt", Some("A"), "", 500);
        let newer = write_transcript(dir.path(), "Local_20251216_100000_111.txt", Some("A"), "", 100);
        let other = write_transcript(dir.path(), "Local_20251216_100000_222.txt", Some("B"), "", 10);

        assert_eq!(latest_log_for_character(dir.path(), "111"), Some(newer));
        assert_eq!(most_recent_local(dir.path()), Some(other));
        assert!(latest_log_for_character(dir.path(), "999").is_none());
        assert!(most_recent_fleet_file(dir.path()).is_none());
    }

    #[test]
    fn test_missing_directory_gives_empty_registries() {
        let missing = Path::new("/nonexistent/eve/logs");
        assert!(scan_fleets(missing, 1800, Utc::now()).is_empty());
        assert!(scan_characters(missing, &NoWindowCheck, Utc::now()).is_empty());
        assert!(most_recent_local(missing).is_none());
    }
}
