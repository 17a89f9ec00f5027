// EveTranslator - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every tunable bound used by the tailer, discovery, and pipeline lives here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "EVE Translator";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "EveTranslator";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Transcript format
// =============================================================================

/// Sender label the game client uses for its own notices.
pub const SYSTEM_SENDER: &str = "EVE System";

/// chrono format of the bracketed timestamp at the start of every message line.
pub const TRANSCRIPT_TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// chrono format used when handing a message timestamp to presentation.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Header label that carries the owning character's display name.
pub const LISTENER_LABEL: &str = "Listener:";

/// Marker written each time the character jumps to a new solar system.
pub const LOCATION_CHANGE_MARKER: &str = "Channel changed to Local";

/// Number of lines from the top of a transcript searched for header fields.
pub const HEADER_SCAN_LINES: usize = 15;

/// Minimum run of dashes that makes a line a header separator rule.
pub const HEADER_RULE_MIN_DASHES: usize = 20;

/// Glob matched against group-channel transcript file names.
pub const FLEET_FILE_GLOB: &str = "Fleet_*.txt";

/// Glob matched against identity-channel transcript file names.
pub const LOCAL_FILE_GLOB: &str = "Local_*.txt";

/// Prefix of the generated display name when no `Listener:` header is found.
pub const UNKNOWN_CHARACTER_PREFIX: &str = "Character_";

/// Client window title prefix; the character name follows it.
pub const CLIENT_WINDOW_TITLE_PREFIX: &str = "EVE - ";

// =============================================================================
// Session and tail limits
// =============================================================================

/// Default polling interval for each session's tail loop (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;

/// Minimum user-configurable polling interval (seconds).
pub const MIN_POLL_INTERVAL_SECS: f64 = 0.1;

/// Maximum user-configurable polling interval (seconds).
pub const MAX_POLL_INTERVAL_SECS: f64 = 60.0;

/// How often a sleeping background thread checks its cancel flag (ms).
pub const CANCEL_CHECK_INTERVAL_MS: u64 = 100;

/// Completed directory scans applied per manager poll.
pub const MAX_SCANS_PER_POLL: usize = 4;

/// Longest wait for a presentation event before the manager polls again (ms).
pub const EVENT_WAIT_MS: u64 = 200;

/// Default number of history lines backfilled when a session starts.
pub const DEFAULT_HISTORY_LINES: usize = 5;

/// Maximum user-configurable history backfill.
pub const MAX_HISTORY_LINES: usize = 200;

/// A source older than this (seconds since last write) gets no backfill.
pub const HISTORY_FRESHNESS_SECS: u64 = 1_800;

/// Maximum bytes read from a tailed file in one poll tick.
/// A burst of writes larger than this is drained over several ticks.
pub const MAX_TAIL_READ_BYTES_PER_TICK: usize = 512 * 1_024; // 512 KiB

/// Maximum size of the in-progress line buffer before it is discarded.
pub const MAX_TAIL_PARTIAL_BYTES: usize = MAX_TAIL_READ_BYTES_PER_TICK * 4; // 2 MiB

/// First window scanned backwards from the end of a file for history lines.
/// Grows fourfold until enough message lines are found or the start is hit.
pub const HISTORY_SCAN_INITIAL_BYTES: usize = 64 * 1_024;

// =============================================================================
// Discovery limits
// =============================================================================

/// Default discovery rescan interval (seconds).
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;

/// Minimum user-configurable rescan interval (seconds).
pub const MIN_SCAN_INTERVAL_SECS: u64 = 1;

/// Maximum user-configurable rescan interval (seconds).
pub const MAX_SCAN_INTERVAL_SECS: u64 = 3_600;

/// Default inactivity threshold for group channels (seconds).
pub const DEFAULT_FLEET_INACTIVE_THRESHOLD_SECS: u64 = 1_800;

/// Minimum user-configurable group inactivity threshold (seconds).
pub const MIN_FLEET_INACTIVE_THRESHOLD_SECS: u64 = 60;

/// Maximum user-configurable group inactivity threshold (seconds).
pub const MAX_FLEET_INACTIVE_THRESHOLD_SECS: u64 = 86_400;

/// An identity channel written within this many seconds counts as active.
pub const LOCAL_ACTIVE_WINDOW_SECS: u64 = 300;

/// Maximum transcript files considered in one directory scan.
pub const MAX_SCAN_FILES: usize = 10_000;

// =============================================================================
// Language detection
// =============================================================================

/// Language the user already reads; the default ignore set and the fallback
/// classification for short or undetectable ASCII text.
pub const BASE_LANGUAGE: &str = "en";

/// Code reported when detection produced nothing usable.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Han-script (Chinese) language code.
pub const HAN_LANGUAGE: &str = "zh";

/// Japanese language code.
pub const JAPANESE_LANGUAGE: &str = "ja";

/// Korean language code.
pub const KOREAN_LANGUAGE: &str = "ko";

/// ASCII strings shorter than this are classified as `BASE_LANGUAGE` without
/// running statistical detection.
pub const SHORT_ASCII_DETECT_CHARS: usize = 4;

/// Non-CJK text shorter than this (after trimming) is never translated.
pub const MIN_TRANSLATE_CHARS: usize = 2;

/// Maximum regex pattern length accepted from the ignore-pattern file.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

// =============================================================================
// Glossary and translation
// =============================================================================

/// Source language every shipped glossary translates from.
pub const GLOSSARY_SOURCE_LANGUAGE: &str = "zh";

/// Default target language.
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

/// Language pair that has a compiled-in fallback table.
pub const DEFAULT_GLOSSARY_PAIR: (&str, &str) = ("zh", "en");

/// Prefix of user glossary override files (`custom_zh_en.toml`).
pub const USER_GLOSSARY_PREFIX: &str = "custom_";

/// Maximum glossary or ignore-pattern file size in bytes.
pub const MAX_TABLE_FILE_SIZE: u64 = 1024 * 1024; // 1 MiB

/// Prefix of the placeholder substituted for opaque link spans.
pub const LINK_PLACEHOLDER_PREFIX: &str = "__LINK_";

/// Suffix of the placeholder substituted for opaque link spans.
pub const LINK_PLACEHOLDER_SUFFIX: &str = "__";

/// Per-request timeout for network translation providers (seconds).
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Free, unauthenticated web translation endpoint.
pub const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// DeepL endpoint for paid API keys.
pub const DEEPL_PRO_URL: &str = "https://api.deepl.com/v2/translate";

/// DeepL endpoint for free-tier API keys (keys ending in `:fx`).
pub const DEEPL_FREE_URL: &str = "https://api-free.deepl.com/v2/translate";

/// Suffix that marks a DeepL free-tier key.
pub const DEEPL_FREE_KEY_SUFFIX: &str = ":fx";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of message text included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration and resources
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Persisted selection file name (stored in the platform data directory).
pub const SELECTION_FILE_NAME: &str = "selection.json";

/// Current schema version of the persisted selection file.
pub const SELECTION_FILE_VERSION: u32 = 1;

/// User glossary subdirectory name.
pub const GLOSSARIES_DIR_NAME: &str = "glossaries";

/// Ignore-pattern table file name (bundled and user override).
pub const IGNORED_PHRASES_FILE_NAME: &str = "ignored_phrases.toml";

/// Bundled resource directory name, next to the executable.
pub const RESOURCE_DIR_NAME: &str = "assets";

/// Chat-log directory relative to the user's Documents folder.
pub const DEFAULT_CHATLOG_SUBDIR: &[&str] = &["EVE", "logs", "Chatlogs"];
