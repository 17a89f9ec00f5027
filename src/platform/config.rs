// EveTranslator - platform/config.rs
//
// Platform-specific directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows) and
// Library (macOS) compliance.

use crate::core::discovery;
use crate::core::model::{PipelineConfig, SessionConfig};
use crate::util::constants;
use crate::util::error::DiscoveryError;
use directories::{BaseDirs, ProjectDirs, UserDirs};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved platform paths for configuration, state and bundled resources.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Holds `config.toml` and the user ignore-pattern file.
    pub config_dir: PathBuf,

    /// User glossary overrides (`custom_<src>_<tgt>.toml`).
    pub user_glossary_dir: PathBuf,

    /// Persisted selection state.
    pub data_dir: PathBuf,

    /// Bundled glossaries and ignore patterns.
    pub resource_dir: PathBuf,

    /// Where the game client writes chat transcripts by default.
    pub default_log_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        let resource_dir = resolve_resource_dir();
        let default_log_dir = resolve_default_log_dir();

        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let user_glossary_dir = config_dir.join(constants::GLOSSARIES_DIR_NAME);
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                glossaries = %user_glossary_dir.display(),
                data = %data_dir.display(),
                resources = %resource_dir.display(),
                chatlogs = %default_log_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                user_glossary_dir,
                data_dir,
                resource_dir,
                default_log_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                user_glossary_dir: fallback.join(constants::GLOSSARIES_DIR_NAME),
                config_dir: fallback.clone(),
                data_dir: fallback,
                resource_dir,
                default_log_dir,
            }
        }
    }

    /// Keep everything user-writable under `dir` (used by `--config` and
    /// tests). Resources and the default chat-log directory are unchanged.
    pub fn with_config_dir(self, dir: &Path) -> Self {
        Self {
            config_dir: dir.to_path_buf(),
            user_glossary_dir: dir.join(constants::GLOSSARIES_DIR_NAME),
            data_dir: dir.to_path_buf(),
            ..self
        }
    }

    /// Path of the user ignore-pattern file.
    pub fn user_ignore_file(&self) -> PathBuf {
        self.config_dir.join(constants::IGNORED_PHRASES_FILE_NAME)
    }

    /// Path of the bundled ignore-pattern file.
    pub fn bundled_ignore_file(&self) -> PathBuf {
        self.resource_dir.join(constants::IGNORED_PHRASES_FILE_NAME)
    }

    /// Path of the bundled glossary for a language pair.
    pub fn bundled_glossary(&self, source: &str, target: &str) -> PathBuf {
        self.resource_dir
            .join(constants::GLOSSARIES_DIR_NAME)
            .join(format!("{source}_{target}.toml"))
    }

    /// Path of the user glossary override for a language pair.
    pub fn user_glossary(&self, source: &str, target: &str) -> PathBuf {
        self.user_glossary_dir.join(format!(
            "{}{source}_{target}.toml",
            constants::USER_GLOSSARY_PREFIX
        ))
    }
}

/// `assets/` next to the executable, else the crate's own `assets/` when
/// running from a source checkout.
fn resolve_resource_dir() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join(constants::RESOURCE_DIR_NAME)));
    match beside_exe {
        Some(dir) if dir.is_dir() => dir,
        _ => Path::new(env!("CARGO_MANIFEST_DIR")).join(constants::RESOURCE_DIR_NAME),
    }
}

/// `<Documents>/EVE/logs/Chatlogs`, with `<home>/Documents` when the platform
/// has no Documents folder registered.
fn resolve_default_log_dir() -> PathBuf {
    let documents = UserDirs::new()
        .and_then(|u| u.document_dir().map(Path::to_path_buf))
        .or_else(|| BaseDirs::new().map(|b| b.home_dir().join("Documents")))
        .unwrap_or_else(|| PathBuf::from("."));
    constants::DEFAULT_CHATLOG_SUBDIR
        .iter()
        .fold(documents, |acc, part| acc.join(part))
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub translation: TranslationSection,
    pub sessions: SessionsSection,
    pub discovery: DiscoverySection,
    pub selection: SelectionSection,
    pub logging: LoggingSection,
}

/// `[translation]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct TranslationSection {
    /// Language code messages are translated into.
    pub target_language: Option<String>,
    /// Detected languages left untranslated.
    pub ignored_languages: Option<Vec<String>>,
    /// DeepL API key; empty uses the free provider.
    pub deepl_api_key: Option<String>,
}

/// `[sessions]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    pub polling_interval_secs: Option<f64>,
    pub history_lines: Option<usize>,
    pub fleet_enabled: Option<bool>,
    pub local_enabled: Option<bool>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Chat-log directory; empty uses the platform default.
    pub log_dir: Option<String>,
    pub scan_interval_secs: Option<u64>,
    pub fleet_inactive_threshold_secs: Option<u64>,
    pub fleet_auto_switch: Option<bool>,
}

/// `[selection]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    pub character_id: Option<String>,
    pub fleet_id: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Translation --
    pub target_language: String,
    pub ignored_languages: Vec<String>,
    pub deepl_api_key: String,
    /// Offline mock provider; only set from the command line.
    pub mock_provider: bool,

    // -- Sessions --
    pub polling_interval: Duration,
    pub history_lines: usize,
    pub fleet_enabled: bool,
    pub local_enabled: bool,

    // -- Discovery --
    pub log_dir: PathBuf,
    pub scan_interval: Duration,
    pub fleet_inactive_threshold_secs: u64,
    pub fleet_auto_switch: bool,

    // -- Selection --
    pub character_id: Option<String>,
    pub fleet_id: Option<String>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

impl AppConfig {
    /// Defaults, reading transcripts from `log_dir`.
    pub fn with_log_dir(log_dir: PathBuf) -> Self {
        Self {
            target_language: constants::DEFAULT_TARGET_LANGUAGE.to_string(),
            ignored_languages: vec![constants::BASE_LANGUAGE.to_string()],
            deepl_api_key: String::new(),
            mock_provider: false,
            polling_interval: Duration::from_secs_f64(constants::DEFAULT_POLL_INTERVAL_SECS),
            history_lines: constants::DEFAULT_HISTORY_LINES,
            fleet_enabled: true,
            local_enabled: true,
            log_dir,
            scan_interval: Duration::from_secs(constants::DEFAULT_SCAN_INTERVAL_SECS),
            fleet_inactive_threshold_secs: constants::DEFAULT_FLEET_INACTIVE_THRESHOLD_SECS,
            fleet_auto_switch: true,
            character_id: None,
            fleet_id: None,
            log_level: None,
            log_file: None,
        }
    }

    /// Values consumed by the pipeline worker.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            target_language: self.target_language.clone(),
            ignored_languages: self.ignored_languages.iter().cloned().collect::<HashSet<_>>(),
            deepl_api_key: self.deepl_api_key.clone(),
            mock_provider: self.mock_provider,
        }
    }

    /// Values consumed by each session controller.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            polling_interval: self.polling_interval,
            history_lines: self.history_lines,
            history_freshness_secs: constants::HISTORY_FRESHNESS_SECS,
        }
    }

    /// Confirm the chat-log directory is usable.
    ///
    /// This is the one condition that makes the application unable to run.
    pub fn validate_log_dir(&self) -> Result<(), DiscoveryError> {
        discovery::validate_dir(&self.log_dir)
    }
}

/// Load and validate `config.toml` from `paths.config_dir`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unparseable, returns defaults with an error warning.
pub fn load_config(paths: &PlatformPaths) -> (AppConfig, Vec<String>) {
    let config_path = paths.config_dir.join(constants::CONFIG_FILE_NAME);
    let defaults = AppConfig::with_log_dir(paths.default_log_dir.clone());
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (defaults, warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (defaults, warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (defaults, warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let config = validate(raw, defaults, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

/// Apply every set field of `raw` onto `config`, accumulating warnings for
/// values that are out of range.
fn validate(raw: RawConfig, mut config: AppConfig, warnings: &mut Vec<String>) -> AppConfig {
    // -- Translation --
    if let Some(target) = raw.translation.target_language {
        let target = target.trim().to_lowercase();
        if target.is_empty() {
            warnings.push(format!(
                "[translation] target_language is empty. Using default ({}).",
                constants::DEFAULT_TARGET_LANGUAGE
            ));
        } else {
            config.target_language = target;
        }
    }
    if let Some(ignored) = raw.translation.ignored_languages {
        config.ignored_languages = ignored
            .into_iter()
            .map(|code| code.trim().to_lowercase())
            .filter(|code| !code.is_empty())
            .collect();
    }
    if let Some(key) = raw.translation.deepl_api_key {
        config.deepl_api_key = key.trim().to_string();
    }

    // -- Sessions --
    if let Some(secs) = raw.sessions.polling_interval_secs {
        if (constants::MIN_POLL_INTERVAL_SECS..=constants::MAX_POLL_INTERVAL_SECS).contains(&secs) {
            config.polling_interval = Duration::from_secs_f64(secs);
        } else {
            warnings.push(format!(
                "[sessions] polling_interval_secs = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_POLL_INTERVAL_SECS,
                constants::MAX_POLL_INTERVAL_SECS,
                constants::DEFAULT_POLL_INTERVAL_SECS,
            ));
        }
    }
    if let Some(lines) = raw.sessions.history_lines {
        if lines <= constants::MAX_HISTORY_LINES {
            config.history_lines = lines;
        } else {
            warnings.push(format!(
                "[sessions] history_lines = {lines} is out of range (0-{}). Using default ({}).",
                constants::MAX_HISTORY_LINES,
                constants::DEFAULT_HISTORY_LINES,
            ));
        }
    }
    if let Some(enabled) = raw.sessions.fleet_enabled {
        config.fleet_enabled = enabled;
    }
    if let Some(enabled) = raw.sessions.local_enabled {
        config.local_enabled = enabled;
    }

    // -- Discovery --
    if let Some(dir) = raw.discovery.log_dir {
        if !dir.trim().is_empty() {
            config.log_dir = PathBuf::from(dir.trim());
        }
    }
    if let Some(secs) = raw.discovery.scan_interval_secs {
        if (constants::MIN_SCAN_INTERVAL_SECS..=constants::MAX_SCAN_INTERVAL_SECS).contains(&secs) {
            config.scan_interval = Duration::from_secs(secs);
        } else {
            warnings.push(format!(
                "[discovery] scan_interval_secs = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_SCAN_INTERVAL_SECS,
                constants::MAX_SCAN_INTERVAL_SECS,
                constants::DEFAULT_SCAN_INTERVAL_SECS,
            ));
        }
    }
    if let Some(secs) = raw.discovery.fleet_inactive_threshold_secs {
        if (constants::MIN_FLEET_INACTIVE_THRESHOLD_SECS
            ..=constants::MAX_FLEET_INACTIVE_THRESHOLD_SECS)
            .contains(&secs)
        {
            config.fleet_inactive_threshold_secs = secs;
        } else {
            warnings.push(format!(
                "[discovery] fleet_inactive_threshold_secs = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_FLEET_INACTIVE_THRESHOLD_SECS,
                constants::MAX_FLEET_INACTIVE_THRESHOLD_SECS,
                constants::DEFAULT_FLEET_INACTIVE_THRESHOLD_SECS,
            ));
        }
    }
    if let Some(auto) = raw.discovery.fleet_auto_switch {
        config.fleet_auto_switch = auto;
    }

    // -- Selection --
    config.character_id = raw.selection.character_id.filter(|s| !s.trim().is_empty());
    config.fleet_id = raw.selection.fleet_id.filter(|s| !s.trim().is_empty());

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    config
}

// =============================================================================
// Tests
// =============================================================================
