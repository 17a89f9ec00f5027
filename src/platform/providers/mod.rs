// EveTranslator - platform/providers/mod.rs
//
// Network translation providers and the factory that picks one.
//
// Each network provider owns a small tokio runtime and blocks on it, so the
// pipeline worker calls them like any synchronous function.

pub mod deepl;
pub mod google;

use crate::core::translate::{MockProvider, TranslationProvider};
use crate::util::constants::PROVIDER_TIMEOUT_SECS;
use crate::util::error::TranslationError;
use std::sync::Arc;
use std::time::Duration;

pub use deepl::DeepLProvider;
pub use google::GoogleProvider;

/// Longest provider error body kept in a `TranslationError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Pick a provider: the mock when forced, DeepL when a key is set, Google
/// otherwise.
///
/// A provider that cannot be built falls back to the next one in the chain
/// DeepL -> Google -> Mock, so this never fails.
pub fn create_provider(deepl_api_key: &str, force_mock: bool) -> Arc<dyn TranslationProvider> {
    if force_mock {
        tracing::info!(provider = MockProvider::NAME, "Translation provider selected");
        return Arc::new(MockProvider);
    }

    let key = deepl_api_key.trim();
    if !key.is_empty() {
        match DeepLProvider::new(key) {
            Ok(p) => {
                tracing::info!(provider = DeepLProvider::NAME, "Translation provider selected");
                return Arc::new(p);
            }
            Err(e) => {
                tracing::warn!(error = %e, "DeepL provider unavailable, falling back to Google");
            }
        }
    }

    match GoogleProvider::new() {
        Ok(p) => {
            tracing::info!(provider = GoogleProvider::NAME, "Translation provider selected");
            Arc::new(p)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Google provider unavailable, falling back to Mock");
            Arc::new(MockProvider)
        }
    }
}

/// Single-threaded runtime for one provider's blocking calls.
pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, TranslationError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TranslationError::Runtime { source: e })
}

/// HTTP client with the provider request timeout applied.
pub(crate) fn build_client(provider: &'static str) -> Result<reqwest::Client, TranslationError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()
        .map_err(|e| TranslationError::Http {
            provider,
            source: e,
        })
}

/// Error body shortened for logs.
pub(crate) fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((i, _)) => format!("{}...", &trimmed[..i]),
        None => trimmed.to_string(),
    }
}
