// EveTranslator - core/translate.rs
//
// Translation provider abstraction and provider-specific language codes.
// Core layer: no network access. Network providers live in
// platform::providers and implement `TranslationProvider`.

use crate::util::constants::{HAN_LANGUAGE, UNKNOWN_LANGUAGE};
use crate::util::error::TranslationError;

/// A translation backend.
///
/// Implementations must be usable from the pipeline worker thread while the
/// presentation side swaps in a replacement; the orchestrator holds them
/// behind an `Arc`, so an in-flight call keeps its provider alive.
pub trait TranslationProvider: Send + Sync {
    /// Short display name reported alongside every result.
    fn name(&self) -> &'static str;

    /// Translate `text` into `target_lang`.
    ///
    /// `source_lang` is a hint; `None` lets the backend detect it.
    fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<String, TranslationError>;
}

// =============================================================================
// Mock provider
// =============================================================================

/// Offline provider that tags its input instead of translating it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockProvider;

impl MockProvider {
    pub const NAME: &'static str = "Mock";
}

impl TranslationProvider for MockProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn translate(
        &self,
        text: &str,
        _target_lang: &str,
        _source_lang: Option<&str>,
    ) -> Result<String, TranslationError> {
        Ok(format!("[MOCK] {text}"))
    }
}

// =============================================================================
// Google web endpoint codes
// =============================================================================

/// Source code for the Google web endpoint: `auto` when there is no usable
/// hint, `zh-CN` for Chinese.
pub fn google_source_code(source_lang: Option<&str>) -> String {
    match source_lang.map(str::trim) {
        None | Some("") | Some("auto") => "auto".to_string(),
        Some(code) if code == UNKNOWN_LANGUAGE => "auto".to_string(),
        Some(code) => google_code(code),
    }
}

/// Target code for the Google web endpoint.
pub fn google_target_code(target_lang: &str) -> String {
    google_code(target_lang.trim())
}

fn google_code(code: &str) -> String {
    if code.eq_ignore_ascii_case(HAN_LANGUAGE) {
        "zh-CN".to_string()
    } else {
        code.to_string()
    }
}

// =============================================================================
// DeepL codes
// =============================================================================

/// Source languages DeepL accepts as a hint.
const DEEPL_SOURCE_LANGUAGES: &[&str] = &[
    "BG", "CS", "DA", "DE", "EL", "EN", "ES", "ET", "FI", "FR", "HU", "ID", "IT", "JA", "KO",
    "LT", "LV", "NB", "NL", "PL", "PT", "RO", "RU", "SK", "SL", "SV", "TR", "UK", "ZH",
];

/// DeepL target code. English and Portuguese need a regional variant.
///
/// Returns `None` for an empty code.
pub fn deepl_target_code(target_lang: &str) -> Option<String> {
    let code = target_lang.trim().to_ascii_lowercase();
    let mapped = match code.as_str() {
        "" => return None,
        "en" => "EN-US".to_string(),
        "gb" | "en-gb" => "EN-GB".to_string(),
        "pt" => "PT-PT".to_string(),
        "pt-br" => "PT-BR".to_string(),
        other => other.to_ascii_uppercase(),
    };
    Some(mapped)
}

/// DeepL source hint, or `None` when the code is not one DeepL accepts.
///
/// Region suffixes are dropped (`pt-BR` -> `PT`) and the generic Norwegian
/// code maps to Bokmål.
pub fn deepl_source_code(source_lang: Option<&str>) -> Option<String> {
    let code = source_lang?.trim();
    let base = code.split('-').next().unwrap_or(code).to_ascii_uppercase();
    let base = if base == "NO" { "NB".to_string() } else { base };
    DEEPL_SOURCE_LANGUAGES
        .contains(&base.as_str())
        .then_some(base)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_tags_text() {
        let p = MockProvider;
        assert_eq!(p.name(), "Mock");
        assert_eq!(p.translate("Test", "en", None).expect("mock never fails"), "[MOCK] Test");
    }

    #[test]
    fn test_google_source_code() {
        assert_eq!(google_source_code(None), "auto");
        assert_eq!(google_source_code(Some("auto")), "auto");
        assert_eq!(google_source_code(Some("unknown")), "auto");
        assert_eq!(google_source_code(Some("zh")), "zh-CN");
        assert_eq!(google_source_code(Some("ru")), "ru");
        assert_eq!(google_target_code("zh"), "zh-CN");
    }

    #[test]
    fn test_deepl_target_code() {
        assert_eq!(deepl_target_code("en").as_deref(), Some("EN-US"));
        assert_eq!(deepl_target_code("gb").as_deref(), Some("EN-GB"));
        assert_eq!(deepl_target_code("pt").as_deref(), Some("PT-PT"));
        assert_eq!(deepl_target_code("pt-br").as_deref(), Some("PT-BR"));
        assert_eq!(deepl_target_code("de").as_deref(), Some("DE"));
        assert!(deepl_target_code("  ").is_none());
    }

    /// Unsupported hints are dropped rather than sent.
    #[test]
    fn test_deepl_source_code_filters_unsupported() {
        assert_eq!(deepl_source_code(Some("zh")).as_deref(), Some("ZH"));
        assert_eq!(deepl_source_code(Some("no")).as_deref(), Some("NB"));
        assert_eq!(deepl_source_code(Some("pt-BR")).as_deref(), Some("PT"));
        assert!(deepl_source_code(Some("sw")).is_none());
        assert!(deepl_source_code(Some("unknown")).is_none());
        assert!(deepl_source_code(None).is_none());
    }
}
