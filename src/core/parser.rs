// EveTranslator - core/parser.rs
//
// Chat transcript line parsing.
// Core layer: operates on decoded text lines, never touches the filesystem.
//
// A line that does not look like `[ YYYY.MM.DD HH:MM:SS ] Sender > text` is a
// rejection, not a fault: `parse_line` returns `None` and callers skip it.

use crate::core::model::ChatMessage;
use crate::util::constants;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// Leading BOM/whitespace, bracketed timestamp, sender up to ` > `, body.
fn message_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[\x{feff}\s]*\[\s*(\d{4}\.\d{2}\.\d{2}\s+\d{2}:\d{2}:\d{2})\s*\]\s+([^>]+?)\s+>\s+(.*)$",
        )
        .expect("message pattern is a valid regex")
    })
}

fn header_rule_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"^\s*-{{{},}}\s*$",
            constants::HEADER_RULE_MIN_DASHES
        ))
        .expect("header rule pattern is a valid regex")
    })
}

fn header_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(Channel ID|Channel Name|Listener|Session started):")
            .expect("header label pattern is a valid regex")
    })
}

/// Parse one transcript line into a `ChatMessage`.
///
/// Returns `None` for anything that is not a message line, including lines
/// whose timestamp has the right shape but is not a real date.
pub fn parse_line(line: &str, line_number: u64) -> Option<ChatMessage> {
    if line.is_empty() {
        return None;
    }

    let caps = message_pattern().captures(line)?;
    let raw_timestamp = caps.get(1)?.as_str();
    let sender = caps.get(2)?.as_str().trim();
    let message = caps.get(3)?.as_str();

    // The shape allows any run of whitespace between date and time.
    let normalised = raw_timestamp.split_whitespace().collect::<Vec<_>>().join(" ");
    let timestamp =
        match NaiveDateTime::parse_from_str(&normalised, constants::TRANSCRIPT_TIMESTAMP_FORMAT) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::trace!(line_number, raw = raw_timestamp, error = %e, "Rejected timestamp");
                return None;
            }
        };

    Some(ChatMessage {
        timestamp,
        raw_timestamp: raw_timestamp.to_string(),
        sender: sender.to_string(),
        message: message.to_string(),
        line_number,
        is_system: sender == constants::SYSTEM_SENDER,
    })
}

/// Returns `true` for transcript boilerplate: separator rules, metadata label
/// lines, and blank lines.
pub fn is_header_line(line: &str) -> bool {
    line.trim().is_empty()
        || header_rule_pattern().is_match(line)
        || header_label_pattern().is_match(line)
}

/// Cheap check used by history backfill: does this line carry a message
/// timestamp bracket? Avoids running the full regex over a whole file.
pub fn looks_like_message(line: &str) -> bool {
    line.contains("[ 2") && line.contains("] ")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_basic_message() {
        let msg = parse_line("[ 2025.12.16 08:38:43 ] Eric Atlantis > Hello World", 1)
            .expect("line should parse");
        assert_eq!(msg.sender, "Eric Atlantis");
        assert_eq!(msg.message, "Hello World");
        assert_eq!(msg.raw_timestamp, "2025.12.16 08:38:43");
        assert_eq!(msg.line_number, 1);
        assert!(!msg.is_system);
        assert_eq!(msg.timestamp.year(), 2025);
        assert_eq!(msg.timestamp.hour(), 8);
        assert_eq!(msg.timestamp.second(), 43);
    }

    /// The client writes a BOM at the start of the file; the first message line
    /// read from offset zero carries it.
    #[test]
    fn test_parse_tolerates_bom_and_leading_whitespace() {
        let msg = parse_line("\u{feff}  [ 2025.01.02 03:04:05 ] Pilot > o7", 0)
            .expect("BOM-prefixed line should parse");
        assert_eq!(msg.sender, "Pilot");
        assert_eq!(msg.message, "o7");
    }

    #[test]
    fn test_parse_system_sender() {
        let msg = parse_line(
            "[ 2025.12.16 08:38:43 ] EVE System > Channel changed to Local : Jita*",
            3,
        )
        .expect("system line should parse");
        assert!(msg.is_system);
    }

    #[test]
    fn test_parse_sender_is_trimmed() {
        let msg = parse_line("[ 2025.12.16 08:38:43 ]    Spaced  Name    > hi", 0)
            .expect("line should parse");
        assert_eq!(msg.sender, "Spaced  Name");
    }

    /// Only the first ` > ` separates sender from body; later ones belong to
    /// the message.
    #[test]
    fn test_parse_message_may_contain_separator() {
        let msg = parse_line("[ 2025.12.16 08:38:43 ] A > b > c", 0).expect("should parse");
        assert_eq!(msg.sender, "A");
        assert_eq!(msg.message, "b > c");
    }

    #[test]
    fn test_parse_rejects_non_message_lines() {
        assert!(parse_line("", 0).is_none());
        assert!(parse_line("   Channel ID:      local", 0).is_none());
        assert!(parse_line("---------------------------------------------", 0).is_none());
        assert!(parse_line("[ 2025.12.16 ] Missing time > x", 0).is_none());
        assert!(parse_line("no brackets at all", 0).is_none());
    }

    /// Shape matches but month 13 is not a date: rejected, never panics.
    #[test]
    fn test_parse_rejects_impossible_timestamp() {
        assert!(parse_line("[ 2025.13.40 25:61:61 ] Pilot > hello", 0).is_none());
    }

    #[test]
    fn test_parse_multiple_spaces_between_date_and_time() {
        let msg = parse_line("[ 2025.12.16   08:38:43 ] Pilot > hi", 0).expect("should parse");
        assert_eq!(msg.timestamp.minute(), 38);
    }

    #[test]
    fn test_header_line_detection() {
        assert!(is_header_line("---------------------------------------------------------------"));
        assert!(is_header_line("  Channel Name:    Fleet"));
        assert!(is_header_line("  Listener:        Eric Atlantis"));
        assert!(is_header_line("  Session started: 2025.12.16 08:00:00"));
        assert!(is_header_line("   "));
        assert!(is_header_line(""));
        assert!(!is_header_line("[ 2025.12.16 08:38:43 ] Pilot > hi"));
        assert!(!is_header_line("-----"), "short dash runs are not rules");
    }

    #[test]
    fn test_looks_like_message() {
        assert!(looks_like_message("[ 2025.12.16 08:38:43 ] Pilot > hi"));
        assert!(!looks_like_message("  Listener:        Pilot"));
    }
}
