// EveTranslator - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Chat message (normalised output of parsing)
// =============================================================================

/// A single parsed chat line.
///
/// Immutable once produced; the parser creates exactly one per valid line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Parsed timestamp. Transcripts carry no zone; the client writes EVE time.
    pub timestamp: NaiveDateTime,

    /// Timestamp exactly as it appeared between the brackets.
    pub raw_timestamp: String,

    /// Sender display name, trimmed.
    pub sender: String,

    /// Message body after the `>` separator.
    pub message: String,

    /// Line number supplied by the caller.
    pub line_number: u64,

    /// True when the sender is the client's own system account.
    pub is_system: bool,
}

// =============================================================================
// Tokenized message
// =============================================================================

/// Message text with every opaque link span swapped for a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedMessage {
    /// Input text, untouched.
    pub original: String,

    /// Text with placeholders in place of link spans.
    pub cleaned: String,

    /// Placeholder -> original span, in substitution order.
    pub tokens: Vec<(String, String)>,
}

impl TokenizedMessage {
    /// Returns `true` when at least one link span was replaced.
    pub fn has_tokens(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Substitute every placeholder in `text` back to its original span.
    ///
    /// `text` may be `cleaned` itself or a translation of it; placeholders the
    /// provider dropped are simply absent from the result.
    pub fn restore(&self, text: &str) -> String {
        crate::core::tokenizer::restore(text, &self.tokens)
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// The two logical channel classes, each driven by its own session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Shared group (fleet) channel.
    Fleet,
    /// The player's own location (Local) channel.
    Local,
}

impl SessionKind {
    /// Returns all variants in display order.
    pub fn all() -> &'static [SessionKind] {
        &[SessionKind::Fleet, SessionKind::Local]
    }

    /// Stable identifier used in events and persisted state.
    pub fn id(&self) -> &'static str {
        match self {
            SessionKind::Fleet => "fleet",
            SessionKind::Local => "local",
        }
    }

    /// Short upper-case tag for console and log output.
    pub fn tag(&self) -> &'static str {
        match self {
            SessionKind::Fleet => "FLEET",
            SessionKind::Local => "LOCAL",
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fleet" => Ok(SessionKind::Fleet),
            "local" => Ok(SessionKind::Local),
            other => Err(format!("unknown session '{other}' (expected fleet or local)")),
        }
    }
}

// =============================================================================
// Runtime configuration values
// =============================================================================

/// Settings consumed by the pipeline worker and translation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Language every translated message is rendered in.
    pub target_language: String,

    /// Detected languages that are shown untranslated.
    pub ignored_languages: HashSet<String>,

    /// DeepL key; empty selects the free provider.
    pub deepl_api_key: String,

    /// Use the offline mock provider regardless of the key.
    pub mock_provider: bool,
}

/// Per-session polling and backfill settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Delay between tail polls.
    pub polling_interval: Duration,

    /// History lines shown when a session starts or switches source.
    pub history_lines: usize,

    /// Sources last written longer ago than this get no backfill.
    pub history_freshness_secs: u64,
}

// =============================================================================
// Discovery registries
// =============================================================================

/// One game character seen in the identity-channel transcripts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityInfo {
    /// Numeric character id taken from the file name.
    pub character_id: String,

    /// Display name from the `Listener:` header, or a generated placeholder.
    pub character_name: String,

    /// The character's most recently written transcript.
    pub latest_log_path: PathBuf,

    /// Modification time of `latest_log_path`.
    pub log_mtime: DateTime<Utc>,

    /// Last solar system the transcript recorded a jump into.
    pub system_name: Option<String>,

    /// Written recently, or the character's client window is open.
    pub is_active: bool,
}

/// One group channel that is still considered live.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupInfo {
    /// Stable for the lifetime of the file: the full path as a string.
    pub fleet_id: String,

    /// Character that is listening to this channel.
    pub listener_name: String,

    /// Transcript path.
    pub log_path: PathBuf,

    /// Modification time of the transcript.
    pub log_mtime: DateTime<Utc>,

    /// Creation time from the file name, falling back to the file system.
    pub created_time: DateTime<Utc>,

    /// Written within the inactivity threshold.
    pub is_active: bool,
}

/// Anything that can live in a `Registry`.
pub trait RegistryEntry {
    /// Registry key; unique within one snapshot.
    fn key(&self) -> &str;
}

impl RegistryEntry for IdentityInfo {
    fn key(&self) -> &str {
        &self.character_id
    }
}

impl RegistryEntry for GroupInfo {
    fn key(&self) -> &str {
        &self.fleet_id
    }
}

/// Immutable keyed snapshot produced by one discovery scan.
///
/// Iteration order is insertion order. Inserting an existing key replaces
/// the previous entry in place, so a snapshot never holds duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: RegistryEntry> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert or replace the entry with the same key.
    pub fn insert(&mut self, entry: T) {
        match self.index.get(entry.key()) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(entry.key().to_string(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: RegistryEntry> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RegistryEntry> FromIterator<T> for Registry<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut registry = Self::new();
        for entry in iter {
            registry.insert(entry);
        }
        registry
    }
}

/// Identity-channel registry snapshot.
pub type IdentityRegistry = Registry<IdentityInfo>;

/// Group-channel registry snapshot.
pub type GroupRegistry = Registry<GroupInfo>;

// =============================================================================
// Events surfaced to presentation
// =============================================================================

/// Structured events the core emits for the presentation layer.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A transcript line finished the pipeline.
    MessageReady {
        session: SessionKind,
        /// Text to display (translated when `is_translated`), links restored.
        text: String,
        sender: String,
        /// `HH:MM:SS`.
        timestamp: String,
        /// Pre-translation text when translated, otherwise empty.
        original: String,
        is_translated: bool,
    },

    /// A fresh identity registry snapshot replaced the previous one.
    IdentitiesUpdated(Arc<IdentityRegistry>),

    /// A fresh group registry snapshot replaced the previous one.
    GroupsUpdated {
        registry: Arc<GroupRegistry>,
        selected: Option<String>,
    },

    /// A session started or stopped.
    SessionStateChanged { session: SessionKind, running: bool },

    /// A session switched sources; previously shown messages are stale.
    HistoryCleared { session: SessionKind },
}
