// EveTranslator - core/discovery.rs
//
// Chat-log directory enumeration and transcript metadata parsing.
//
// This module reads directory entries and file *metadata* only. Transcript
// contents are read by the app layer (app::discovery), which passes header
// lines here for parsing.
//
// Per-file I/O errors are non-fatal and collected as warnings. Only a missing
// or non-directory root is an error.

use crate::core::model::{GroupInfo, GroupRegistry};
use crate::util::constants;
use crate::util::error::DiscoveryError;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// =============================================================================
// Enumeration
// =============================================================================

/// One transcript file found in the chat-log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFile {
    pub path: PathBuf,

    /// File name as UTF-8; non-UTF-8 names are skipped during enumeration.
    pub file_name: String,

    /// Last write time. `None` when the platform cannot report it.
    pub modified: Option<DateTime<Utc>>,

    /// File-system creation time, where supported.
    pub created: Option<DateTime<Utc>>,
}

/// Check that `dir` exists and is a directory.
///
/// Uses `fs::metadata` rather than `Path::is_dir` so a permission failure is
/// reported as such instead of as "not found".
pub fn validate_dir(dir: &Path) -> Result<(), DiscoveryError> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DiscoveryError::NotADirectory {
            path: dir.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DiscoveryError::LogDirNotFound {
            path: dir.to_path_buf(),
        }),
        Err(e) => Err(DiscoveryError::Io {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

/// List files directly inside `dir` whose name matches `pattern`.
///
/// The client writes every transcript into one flat directory, so the walk
/// never descends. Results are sorted by path so callers see a stable order.
pub fn list_transcripts(
    dir: &Path,
    pattern: &str,
) -> Result<(Vec<TranscriptFile>, Vec<String>), DiscoveryError> {
    validate_dir(dir)?;

    let glob_pat = match glob::Pattern::new(pattern) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Invalid glob pattern");
            return Ok((Vec::new(), vec![format!("Invalid glob pattern '{pattern}': {e}")]));
        }
    };

    let mut files = Vec::new();
    let mut warnings = Vec::new();

    let walker = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            warnings.push(format!(
                "Skipping '{}': non-UTF-8 filename",
                entry.path().display()
            ));
            continue;
        };
        if !glob_pat.matches(file_name) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                let msg = format!("Cannot read metadata for '{}': {e}", entry.path().display());
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        files.push(TranscriptFile {
            path: entry.path().to_path_buf(),
            file_name: file_name.to_string(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            created: metadata.created().ok().map(DateTime::<Utc>::from),
        });

        if files.len() >= constants::MAX_SCAN_FILES {
            warnings.push(format!(
                "More than {} files match '{pattern}'; the rest were ignored",
                constants::MAX_SCAN_FILES
            ));
            break;
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::trace!(
        dir = %dir.display(),
        pattern,
        found = files.len(),
        warnings = warnings.len(),
        "Transcript listing complete"
    );

    Ok((files, warnings))
}

// =============================================================================
// File-name parsing
// =============================================================================

fn fleet_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Fleet_(\d{8})_(\d{6})(?:_\d+)?\.txt$").expect("fleet name pattern is a valid regex")
    })
}

fn local_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Local_\d{8}_\d{6}_(\d+)\.txt$").expect("local name pattern is a valid regex")
    })
}

/// Creation time embedded in a group-channel file name.
///
/// `Fleet_20251216_082457.txt` and `Fleet_20251216_082457_1117005149.txt`
/// both yield 2025-12-16 08:24:57. The client names files in EVE time, which
/// is UTC.
pub fn parse_fleet_created_time(file_name: &str) -> Option<DateTime<Utc>> {
    let caps = fleet_name_pattern().captures(file_name)?;
    let stamp = format!("{}_{}", caps.get(1)?.as_str(), caps.get(2)?.as_str());
    NaiveDateTime::parse_from_str(&stamp, "%Y%m%d_%H%M%S")
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// Character id embedded in an identity-channel file name.
pub fn parse_local_character_id(file_name: &str) -> Option<String> {
    local_name_pattern()
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// =============================================================================
// Header parsing
// =============================================================================

/// Listener name from the first header lines of a transcript.
///
/// Only the first `HEADER_SCAN_LINES` lines are considered. An empty name is
/// treated as absent.
pub fn find_listener<'a, I>(lines: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .take(constants::HEADER_SCAN_LINES)
        .find_map(|line| {
            let (_, rest) = line.split_once(constants::LISTENER_LABEL)?;
            let name = rest.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
}

/// Location named by one system notice line, if it is a location change.
///
/// `[ ... ] EVE System > Channel changed to Local : Jita` yields `Jita`.
pub fn parse_location_change(line: &str) -> Option<String> {
    if !line.contains(constants::SYSTEM_SENDER) {
        return None;
    }
    let (_, after_marker) = line.split_once(constants::LOCATION_CHANGE_MARKER)?;
    let name = after_marker.split(':').nth(1)?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Last location change recorded anywhere in `lines`. Later entries win.
pub fn find_last_system<'a, I>(lines: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().filter_map(parse_location_change).last()
}

// =============================================================================
// Activity and selection
// =============================================================================

/// Seconds between `mtime` and `now`. Future mtimes count as zero.
pub fn age_secs(mtime: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - mtime).num_seconds()).unwrap_or(0)
}

/// True when the file was written within `threshold_secs` of `now`.
pub fn is_recent(mtime: DateTime<Utc>, now: DateTime<Utc>, threshold_secs: u64) -> bool {
    age_secs(mtime, now) <= threshold_secs
}

/// The group with the latest creation time. On ties the first one in
/// registry order wins.
pub fn most_recent(registry: &GroupRegistry) -> Option<&GroupInfo> {
    registry.iter().fold(None, |best: Option<&GroupInfo>, g| match best {
        Some(b) if b.created_time >= g.created_time => Some(b),
        _ => Some(g),
    })
}

// =============================================================================
// Tests
// =============================================================================
