// EveTranslator - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every subsystem has its own enum and
// the causal chain is kept for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all translator operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum TranslatorError {
    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Chat-log directory discovery failed.
    Discovery(DiscoveryError),

    /// Glossary or ignore-pattern table loading failed.
    Glossary(GlossaryError),

    /// A translation provider call failed.
    Translation(TranslationError),

    /// Writing a registry export failed.
    Export(ExportError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for TranslatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Glossary(e) => write!(f, "Glossary error: {e}"),
            Self::Translation(e) => write!(f, "Translation error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for TranslatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Glossary(e) => Some(e),
            Self::Translation(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to the chat-log directory.
///
/// Only raised when discovery is permanently impossible. Per-file failures
/// during a scan are absorbed as warnings.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The configured chat-log directory does not exist or is not accessible.
    LogDirNotFound { path: PathBuf },

    /// The configured chat-log path is not a directory.
    NotADirectory { path: PathBuf },

    /// Reading the directory failed.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogDirNotFound { path } => write!(
                f,
                "Chat log directory '{}' does not exist. \
                 Set [discovery] log_dir in config.toml or pass --log-dir.",
                path.display()
            ),
            Self::NotADirectory { path } => {
                write!(f, "Chat log path '{}' is not a directory", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Cannot read chat log directory '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for TranslatorError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Glossary errors
// ---------------------------------------------------------------------------

/// Errors related to glossary and ignore-pattern table files.
#[derive(Debug)]
pub enum GlossaryError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Table file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// I/O error reading a table file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for GlossaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Table '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "I/O error reading table '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for GlossaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::FileTooLarge { .. } => None,
        }
    }
}

impl From<GlossaryError> for TranslatorError {
    fn from(e: GlossaryError) -> Self {
        Self::Glossary(e)
    }
}

// ---------------------------------------------------------------------------
// Translation errors
// ---------------------------------------------------------------------------

/// Errors raised by a translation provider.
///
/// These never cross the orchestrator boundary: `TranslationService` turns
/// them into an untranslated result with a failure flag.
#[derive(Debug)]
pub enum TranslationError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    Http {
        provider: &'static str,
        source: reqwest::Error,
    },

    /// The provider answered with a non-success HTTP status.
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The provider answered successfully but with no translated text.
    EmptyResponse { provider: &'static str },

    /// The response body did not have the expected shape.
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    /// The target language code cannot be expressed for this provider.
    InvalidLanguage {
        provider: &'static str,
        code: String,
    },

    /// The async runtime backing a network provider could not be built.
    Runtime { source: io::Error },
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { provider, source } => write!(f, "{provider}: request failed: {source}"),
            Self::Status {
                provider,
                status,
                message,
            } => write!(f, "{provider}: HTTP {status}: {message}"),
            Self::EmptyResponse { provider } => {
                write!(f, "{provider}: no translation returned")
            }
            Self::MalformedResponse { provider, reason } => {
                write!(f, "{provider}: unexpected response: {reason}")
            }
            Self::InvalidLanguage { provider, code } => {
                write!(f, "{provider}: unsupported target language '{code}'")
            }
            Self::Runtime { source } => {
                write!(f, "Failed to create async runtime: {source}")
            }
        }
    }
}

impl std::error::Error for TranslationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http { source, .. } => Some(source),
            Self::Runtime { source } => Some(source),
            _ => None,
        }
    }
}

impl From<TranslationError> for TranslatorError {
    fn from(e: TranslationError) -> Self {
        Self::Translation(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to exporting discovery registries.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for TranslatorError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading or writing a config file.
    Io { path: PathBuf, source: io::Error },

    /// JSON (de)serialisation of persisted state failed.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "State file error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::ValueOutOfRange { .. } => None,
        }
    }
}

impl From<ConfigError> for TranslatorError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for translator results.
pub type Result<T> = std::result::Result<T, TranslatorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    /// The top-level error keeps the subsystem error as its source so the
    /// full chain can be logged.
    #[test]
    fn test_discovery_error_chain_preserved() {
        let inner = DiscoveryError::Io {
            path: PathBuf::from("/logs"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let outer: TranslatorError = inner.into();
        let source = outer.source().expect("outer error must have a source");
        assert!(source.to_string().contains("/logs"));
        assert!(
            source.source().is_some(),
            "io::Error must remain reachable through the chain"
        );
    }

    #[test]
    fn test_log_dir_not_found_message_is_actionable() {
        let e = DiscoveryError::LogDirNotFound {
            path: PathBuf::from("/missing"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/missing"));
        assert!(msg.contains("--log-dir"), "message should tell the user how to fix it: {msg}");
    }
}
