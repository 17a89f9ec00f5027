// EveTranslator - app/translator.rs
//
// Translation orchestrator: glossary substitution followed by a provider
// call, with failures absorbed into an untranslated result.
//
// Also loads the on-disk tables the pipeline needs. Glossaries merge the
// bundled table with the user override (user wins). Ignore patterns come
// from the user file when present, else the bundled file, else the
// compiled-in fallback. Every table file is size-capped.

use crate::core::detector::IgnorePatterns;
use crate::core::glossary::{parse_glossary_toml, Glossary, TermTable};
use crate::core::model::PipelineConfig;
use crate::core::translate::TranslationProvider;
use crate::platform::config::PlatformPaths;
use crate::platform::providers::create_provider;
use crate::util::constants::{GLOSSARY_SOURCE_LANGUAGE, MAX_TABLE_FILE_SIZE};
use crate::util::error::GlossaryError;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// Table loading
// =============================================================================

/// Read a table file, or `Ok(None)` when it does not exist.
fn read_table_file(path: &Path) -> Result<Option<String>, GlossaryError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GlossaryError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    if meta.len() > MAX_TABLE_FILE_SIZE {
        return Err(GlossaryError::FileTooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max_size: MAX_TABLE_FILE_SIZE,
        });
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| GlossaryError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn load_term_layer(path: &Path) -> Option<TermTable> {
    match read_table_file(path).and_then(|c| c.map(|c| parse_glossary_toml(&c, path)).transpose()) {
        Ok(Some(terms)) => {
            tracing::debug!(file = %path.display(), terms = terms.len(), "Glossary layer loaded");
            Some(terms)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Glossary layer skipped");
            None
        }
    }
}

/// Build the glossary for one language pair from the bundled and user
/// tables.
pub fn load_glossary(paths: &PlatformPaths, source: &str, target: &str) -> Glossary {
    let layers: Vec<TermTable> = [
        paths.bundled_glossary(source, target),
        paths.user_glossary(source, target),
    ]
    .iter()
    .filter_map(|p| load_term_layer(p))
    .collect();

    let glossary = Glossary::from_layers(source, target, layers);
    tracing::info!(
        pair = %format!("{source}->{target}"),
        terms = glossary.len(),
        "Glossary ready"
    );
    glossary
}

/// Load the ignore-pattern table. The first file that exists wins; a file
/// that fails to load falls through to the next candidate.
pub fn load_ignore_patterns(paths: &PlatformPaths) -> IgnorePatterns {
    for path in [paths.user_ignore_file(), paths.bundled_ignore_file()] {
        let content = match read_table_file(&path) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Ignore-pattern file skipped");
                continue;
            }
        };
        match IgnorePatterns::from_toml(&content, &path) {
            Ok((patterns, warnings)) => {
                for w in &warnings {
                    tracing::warn!(file = %path.display(), warning = %w, "Ignore pattern skipped");
                }
                tracing::info!(file = %path.display(), patterns = patterns.len(), "Ignore patterns loaded");
                return patterns;
            }
            Err(e) => tracing::warn!(error = %e, "Ignore-pattern file skipped"),
        }
    }
    tracing::info!("Using built-in ignore patterns");
    IgnorePatterns::fallback()
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Result of one orchestrated translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    /// Provider output, or the glossary-substituted input on failure.
    pub text: String,
    pub success: bool,
    pub provider: &'static str,
}

/// Owns the active provider and glossary. Both are replaced wholesale on
/// reconfiguration; a call already holding the old `Arc` finishes with it.
pub struct TranslationService {
    provider: Arc<dyn TranslationProvider>,
    glossary: Arc<Glossary>,
    paths: Option<PlatformPaths>,
    config: PipelineConfig,
}

impl TranslationService {
    /// Build the provider and glossary for `config`, loading tables from
    /// `paths`.
    pub fn new(paths: PlatformPaths, config: PipelineConfig) -> Self {
        let provider = create_provider(&config.deepl_api_key, config.mock_provider);
        let glossary = load_glossary(&paths, GLOSSARY_SOURCE_LANGUAGE, &config.target_language);
        Self {
            provider,
            glossary: Arc::new(glossary),
            paths: Some(paths),
            config,
        }
    }

    /// Service with an explicit provider and glossary and no table files.
    pub fn with_parts(
        provider: Arc<dyn TranslationProvider>,
        glossary: Glossary,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            glossary: Arc::new(glossary),
            paths: None,
            config,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn glossary(&self) -> &Glossary {
        &self.glossary
    }

    /// Apply a new configuration.
    ///
    /// A target-language change rebuilds the glossary from scratch. A change
    /// to the API key or mock flag selects a new provider.
    pub fn set_config(&mut self, config: PipelineConfig) {
        if config.target_language != self.config.target_language {
            let glossary = match &self.paths {
                Some(paths) => {
                    load_glossary(paths, GLOSSARY_SOURCE_LANGUAGE, &config.target_language)
                }
                None => Glossary::empty(GLOSSARY_SOURCE_LANGUAGE, &config.target_language),
            };
            self.glossary = Arc::new(glossary);
        }

        let key_changed = config.deepl_api_key.trim() != self.config.deepl_api_key.trim();
        if key_changed || config.mock_provider != self.config.mock_provider {
            let previous = self.provider.name();
            self.provider = create_provider(&config.deepl_api_key, config.mock_provider);
            tracing::info!(from = previous, to = self.provider.name(), "Translation provider switched");
        }

        self.config = config;
    }

    /// Glossary substitution, then the provider call.
    ///
    /// Never fails: on provider error the substituted text comes back with
    /// `success == false`. Blank input returns unchanged without a call.
    pub fn translate_message(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> TranslationOutcome {
        let provider = Arc::clone(&self.provider);
        if text.trim().is_empty() {
            return TranslationOutcome {
                text: text.to_string(),
                success: true,
                provider: provider.name(),
            };
        }

        let substituted = self.glossary.replace_terms(text);
        match provider.translate(&substituted, target_lang, source_lang) {
            Ok(translated) => TranslationOutcome {
                text: translated,
                success: true,
                provider: provider.name(),
            },
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Translation failed; showing original");
                TranslationOutcome {
                    text: substituted,
                    success: false,
                    provider: provider.name(),
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
