// EveTranslator - core/detector.rs
//
// Language classification and the translate/skip decision.
// Core layer: ignore-pattern tables arrive as TOML strings; reading the files
// is the app layer's job (app::translator).
//
// Decision order, first match wins:
//   1. ignore-pattern table (spam keywords + chat slang)  -> skip
//   2. any CJK character  -> corrected CJK code, skip only if zh/ja/ko all ignored
//   3. trimmed text shorter than MIN_TRANSLATE_CHARS      -> skip
//   4. statistical detection (short ASCII short-circuits to the base language)
//   5. ignored or unknown language                         -> skip

use crate::util::constants::{
    BASE_LANGUAGE, HAN_LANGUAGE, JAPANESE_LANGUAGE, KOREAN_LANGUAGE, MAX_REGEX_PATTERN_LENGTH,
    MIN_TRANSLATE_CHARS, SHORT_ASCII_DETECT_CHARS, UNKNOWN_LANGUAGE,
};
use crate::util::error::GlossaryError;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

// =============================================================================
// Script ranges
// =============================================================================

fn cjk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x{4e00}-\x{9fff}\x{3040}-\x{309f}\x{30a0}-\x{30ff}\x{ac00}-\x{d7af}]")
            .expect("CJK pattern is a valid regex")
    })
}

fn hangul_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x{ac00}-\x{d7af}]").expect("Hangul pattern is a valid regex")
    })
}

fn kana_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x{3040}-\x{30ff}]").expect("Kana pattern is a valid regex")
    })
}

/// Returns `true` if `text` contains any Han, Kana, or Hangul character.
pub fn is_cjk(text: &str) -> bool {
    cjk_pattern().is_match(text)
}

// =============================================================================
// Statistical detection seam
// =============================================================================

/// Underlying n-gram style language identifier.
pub trait StatisticalDetector: Send + Sync {
    /// Most likely language as a short code (ISO 639-1 where one exists).
    /// `None` when the text carries no usable signal.
    fn detect(&self, text: &str) -> Option<String>;
}

/// `whatlang`-backed detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl StatisticalDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = whatlang::detect(text)?;
        Some(iso639_1(info.lang().code()).to_string())
    }
}

/// Map whatlang's ISO 639-3 codes onto the two-letter codes used by the
/// configuration and the translation providers. Codes without a two-letter
/// form pass through unchanged.
fn iso639_1(code: &'static str) -> &'static str {
    match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        // Bokmål is reported as generic Norwegian; providers remap it.
        "nob" => "no",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        other => other,
    }
}

// =============================================================================
// Ignore-pattern table
// =============================================================================

/// Compiled-in spam keywords used when no table file is available.
const FALLBACK_FORCE_IGNORE: &[&str] = &[
    "HyperNet",
    "contract",
    "WTS",
    "WTB",
    "WTT",
    "zkillboard",
    "blueprint",
    "skin",
    "skill extractor",
    "skill injector",
    "plex",
    "abyssal",
    "repairer",
    "armor",
    "shield",
    "booster",
    "hardener",
    "stabilizer",
    "bpo",
    "bpc",
];

/// Compiled-in chat slang used when no table file is available.
const FALLBACK_SLANG: &[&str] = &[
    r"^[l1]+[o0]+[l1]+$",
    r"^lmao+$",
    r"^rofl+$",
    r"^wtf+$",
    r"^omg+$",
    r"^afk$",
    r"^brb$",
    r"^o7+$",
    r"^gf+$",
    r"^gg+$",
];

/// Raw TOML shape of `ignored_phrases.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IgnoreTableDef {
    /// Trade spam and item keywords (regex, case-insensitive).
    pub force_ignore: Vec<String>,
    /// Whole-message slang patterns (regex, case-insensitive).
    pub slang: Vec<String>,
}

/// Where the active ignore table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    Fallback,
    File(String),
}

/// Compiled, immutable ignore table. Replaced wholesale on reload.
#[derive(Debug, Clone)]
pub struct IgnorePatterns {
    patterns: Vec<Regex>,
    source: PatternSource,
}

impl IgnorePatterns {
    /// The compiled-in tables.
    pub fn fallback() -> Self {
        let (patterns, _) = compile_patterns(FALLBACK_FORCE_IGNORE.iter().chain(FALLBACK_SLANG));
        Self {
            patterns,
            source: PatternSource::Fallback,
        }
    }

    /// Parse and compile an ignore table from TOML content.
    ///
    /// Invalid or oversized patterns are skipped and reported in the returned
    /// warnings; a file that fails to parse as TOML is an error.
    pub fn from_toml(content: &str, source_path: &Path) -> Result<(Self, Vec<String>), GlossaryError> {
        let def: IgnoreTableDef = toml::from_str(content).map_err(|e| GlossaryError::TomlParse {
            path: source_path.to_path_buf(),
            source: e,
        })?;

        let (patterns, warnings) = compile_patterns(def.force_ignore.iter().chain(&def.slang));
        Ok((
            Self {
                patterns,
                source: PatternSource::File(source_path.display().to_string()),
            },
            warnings,
        ))
    }

    /// Returns `true` if any pattern matches the trimmed text.
    pub fn matches(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.patterns.iter().any(|re| re.is_match(trimmed))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn source(&self) -> &PatternSource {
        &self.source
    }
}

fn compile_patterns<I, S>(raw: I) -> (Vec<Regex>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut patterns = Vec::new();
    let mut warnings = Vec::new();
    for pattern in raw {
        let pattern = pattern.as_ref();
        if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
            warnings.push(format!(
                "Ignore pattern of {} chars exceeds maximum of {MAX_REGEX_PATTERN_LENGTH}; skipped",
                pattern.len()
            ));
            continue;
        }
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => patterns.push(re),
            Err(e) => warnings.push(format!("Invalid ignore pattern '{pattern}': {e}; skipped")),
        }
    }
    (patterns, warnings)
}

// =============================================================================
// Decision
// =============================================================================

/// Why a message is not forwarded to translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched the ignore-pattern table.
    IgnoredKeyword,
    /// Non-CJK text too short to be worth a provider call.
    ShortText,
    /// Detected language is in the caller's ignore set.
    IgnoredLanguage(String),
    /// Detection produced nothing usable.
    Unknown,
}

impl SkipReason {
    pub fn as_str(&self) -> &str {
        match self {
            SkipReason::IgnoredKeyword => "ignored_keyword",
            SkipReason::ShortText => "short_text",
            SkipReason::IgnoredLanguage(code) => code,
            SkipReason::Unknown => UNKNOWN_LANGUAGE,
        }
    }
}

/// Outcome of `LanguageDetector::should_translate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Translate { language: String },
    Skip(SkipReason),
}

impl Verdict {
    pub fn should_translate(&self) -> bool {
        matches!(self, Verdict::Translate { .. })
    }

    /// Detected language, or the skip reason label.
    pub fn label(&self) -> &str {
        match self {
            Verdict::Translate { language } => language,
            Verdict::Skip(reason) => reason.as_str(),
        }
    }
}

// =============================================================================
// Detector
// =============================================================================

/// Language detector combining the ignore table, CJK script heuristics, and a
/// statistical identifier.
#[derive(Clone)]
pub struct LanguageDetector {
    patterns: Arc<IgnorePatterns>,
    statistical: Arc<dyn StatisticalDetector>,
}

impl LanguageDetector {
    pub fn new(patterns: IgnorePatterns, statistical: Arc<dyn StatisticalDetector>) -> Self {
        Self {
            patterns: Arc::new(patterns),
            statistical,
        }
    }

    /// Swap in a freshly loaded ignore table.
    pub fn set_patterns(&mut self, patterns: IgnorePatterns) {
        self.patterns = Arc::new(patterns);
    }

    pub fn patterns(&self) -> &IgnorePatterns {
        &self.patterns
    }

    /// Identify the language of `text`.
    ///
    /// Short ASCII never reaches the statistical detector. Pure Han text is
    /// reported as Chinese even when the detector says Japanese or Korean.
    pub fn detect_language(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return UNKNOWN_LANGUAGE.to_string();
        }
        let ascii = text.is_ascii();
        if ascii && text.chars().count() < SHORT_ASCII_DETECT_CHARS {
            return BASE_LANGUAGE.to_string();
        }

        let detected = match self.statistical.detect(text) {
            Some(code) => code,
            None if ascii => return BASE_LANGUAGE.to_string(),
            None => UNKNOWN_LANGUAGE.to_string(),
        };

        if is_cjk(text) {
            return correct_cjk(text, detected);
        }
        detected
    }

    /// Decide whether `text` should be sent to a translation provider.
    ///
    /// `ignored` holds the language codes the user already reads.
    pub fn should_translate(&self, text: &str, ignored: &HashSet<String>) -> Verdict {
        if self.patterns.matches(text) {
            return Verdict::Skip(SkipReason::IgnoredKeyword);
        }

        if is_cjk(text) {
            let language = self.detect_language(text);
            let all_cjk_ignored = [HAN_LANGUAGE, JAPANESE_LANGUAGE, KOREAN_LANGUAGE]
                .iter()
                .all(|code| ignored.contains(*code));
            if all_cjk_ignored {
                return Verdict::Skip(SkipReason::IgnoredLanguage(language));
            }
            return Verdict::Translate { language };
        }

        if text.trim().chars().count() < MIN_TRANSLATE_CHARS {
            return Verdict::Skip(SkipReason::ShortText);
        }

        let language = self.detect_language(text);
        if ignored.contains(&language) {
            return Verdict::Skip(SkipReason::IgnoredLanguage(language));
        }
        if language == UNKNOWN_LANGUAGE {
            return Verdict::Skip(SkipReason::Unknown);
        }
        Verdict::Translate { language }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(IgnorePatterns::fallback(), Arc::new(WhatlangDetector))
    }
}

impl std::fmt::Debug for LanguageDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageDetector")
            .field("patterns", &self.patterns.len())
            .field("source", self.patterns.source())
            .finish()
    }
}

/// Statistical detectors confuse short Han text with Korean and Japanese.
/// Korean needs Hangul and Japanese needs Kana; anything else is Chinese.
fn correct_cjk(text: &str, detected: String) -> String {
    let is_zh = detected.starts_with(HAN_LANGUAGE);
    if !is_zh && detected != JAPANESE_LANGUAGE && detected != KOREAN_LANGUAGE {
        return HAN_LANGUAGE.to_string();
    }
    if detected == KOREAN_LANGUAGE && !hangul_pattern().is_match(text) {
        return HAN_LANGUAGE.to_string();
    }
    if detected == JAPANESE_LANGUAGE && !kana_pattern().is_match(text) {
        return HAN_LANGUAGE.to_string();
    }
    detected
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always answers with a fixed code and counts how often it was asked.
    struct FixedDetector {
        answer: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedDetector {
        fn new(answer: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl StatisticalDetector for FixedDetector {
        fn detect(&self, _text: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.map(str::to_string)
        }
    }

    fn english_only() -> HashSet<String> {
        ["en".to_string()].into_iter().collect()
    }

    fn detector_with(stat: Arc<FixedDetector>) -> LanguageDetector {
        LanguageDetector::new(IgnorePatterns::fallback(), stat)
    }

    #[test]
    fn test_is_cjk_ranges() {
        assert!(is_cjk("刷怪"));
        assert!(is_cjk("ひらがな"));
        assert!(is_cjk("カタカナ"));
        assert!(is_cjk("안녕"));
        assert!(!is_cjk("hello"));
        assert!(!is_cjk("привет"));
    }

    /// Pure Han text is Chinese no matter what the statistical detector says.
    #[test]
    fn test_pure_han_corrected_to_chinese() {
        for claimed in [Some("ko"), Some("ja"), Some("sw"), None] {
            let d = detector_with(FixedDetector::new(claimed));
            assert_eq!(d.detect_language("刷怪"), "zh", "claimed {claimed:?}");
            assert_eq!(d.detect_language("跳跳跳"), "zh", "claimed {claimed:?}");
        }
    }

    #[test]
    fn test_kana_keeps_japanese_and_hangul_keeps_korean() {
        let ja = detector_with(FixedDetector::new(Some("ja")));
        assert_eq!(ja.detect_language("こんにちは世界"), "ja");
        let ko = detector_with(FixedDetector::new(Some("ko")));
        assert_eq!(ko.detect_language("안녕하세요"), "ko");
    }

    /// Short ASCII strings never reach the statistical detector.
    #[test]
    fn test_short_ascii_short_circuits() {
        let stat = FixedDetector::new(Some("so"));
        let d = detector_with(Arc::clone(&stat));
        for text in ["3x", "x", "abc", "o/"] {
            assert_eq!(d.detect_language(text), "en", "text {text:?}");
        }
        assert_eq!(stat.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_detector_failure_fallbacks() {
        let d = detector_with(FixedDetector::new(None));
        assert_eq!(d.detect_language("++++"), "en", "ASCII falls back to base");
        assert_eq!(d.detect_language("ñññññ"), "unknown", "non-ASCII has no fallback");
        assert_eq!(d.detect_language("   "), "unknown");
    }

    #[test]
    fn test_numbers_and_symbols_not_translated() {
        let d = LanguageDetector::default();
        for text in ["666", "111", "++++"] {
            let v = d.should_translate(text, &english_only());
            assert!(!v.should_translate(), "{text:?} should not translate, got {v:?}");
        }
    }

    #[test]
    fn test_keyword_and_slang_ignored() {
        let d = detector_with(FixedDetector::new(Some("de")));
        let ignored = english_only();
        assert_eq!(
            d.should_translate("Verkaufe PLEX billig", &ignored),
            Verdict::Skip(SkipReason::IgnoredKeyword)
        );
        assert_eq!(
            d.should_translate("  LOOOL ", &ignored),
            Verdict::Skip(SkipReason::IgnoredKeyword)
        );
        assert_eq!(
            d.should_translate("o777", &ignored),
            Verdict::Skip(SkipReason::IgnoredKeyword)
        );
    }

    /// Keyword matches win even over CJK text.
    #[test]
    fn test_keyword_checked_before_cjk() {
        let d = detector_with(FixedDetector::new(Some("zh")));
        assert_eq!(
            d.should_translate("WTS 毒蜥", &english_only()).label(),
            "ignored_keyword"
        );
    }

    #[test]
    fn test_cjk_translated_unless_all_cjk_ignored() {
        let d = detector_with(FixedDetector::new(Some("ko")));
        assert_eq!(
            d.should_translate("吉他收脑插", &english_only()),
            Verdict::Translate {
                language: "zh".to_string()
            }
        );

        let only_zh: HashSet<String> = ["zh".to_string()].into_iter().collect();
        assert!(
            d.should_translate("吉他收脑插", &only_zh).should_translate(),
            "ignoring zh alone still translates CJK"
        );

        let all: HashSet<String> = ["zh", "ja", "ko"].iter().map(|s| s.to_string()).collect();
        assert!(!d.should_translate("吉他收脑插", &all).should_translate());
    }

    /// A single CJK character is still translated; the length guard only
    /// applies to non-CJK text.
    #[test]
    fn test_single_cjk_char_not_short_text() {
        let d = detector_with(FixedDetector::new(None));
        assert!(d.should_translate("跳", &english_only()).should_translate());
    }

    #[test]
    fn test_short_text_skipped() {
        let d = detector_with(FixedDetector::new(Some("de")));
        assert_eq!(
            d.should_translate(" é ", &english_only()),
            Verdict::Skip(SkipReason::ShortText)
        );
    }

    #[test]
    fn test_unknown_language_skipped() {
        let d = detector_with(FixedDetector::new(None));
        assert_eq!(
            d.should_translate("ñññññ ñññ", &english_only()),
            Verdict::Skip(SkipReason::Unknown)
        );
    }

    #[test]
    fn test_foreign_language_translated() {
        let d = detector_with(FixedDetector::new(Some("es")));
        assert_eq!(
            d.should_translate("Hola Mundo", &english_only()),
            Verdict::Translate {
                language: "es".to_string()
            }
        );
    }

    #[test]
    fn test_ignored_language_skipped() {
        let d = detector_with(FixedDetector::new(Some("de")));
        let ignored: HashSet<String> = ["en", "de"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            d.should_translate("Guten Morgen zusammen", &ignored),
            Verdict::Skip(SkipReason::IgnoredLanguage("de".to_string()))
        );
    }

    #[test]
    fn test_ignore_table_from_toml_replaces_fallback() {
        let toml = r#"
            force_ignore = ["spaceship"]
            slang = ["^kek$", "(unclosed"]
        "#;
        let (patterns, warnings) =
            IgnorePatterns::from_toml(toml, Path::new("ignored_phrases.toml")).expect("valid TOML");
        assert_eq!(patterns.len(), 2);
        assert_eq!(warnings.len(), 1, "invalid regex is reported: {warnings:?}");
        assert!(patterns.matches("Buying SPACESHIP"));
        assert!(patterns.matches("KEK"));
        assert!(!patterns.matches("WTS stuff"), "file replaces, not merges, the fallback");
    }

    #[test]
    fn test_ignore_table_bad_toml_is_error() {
        let result = IgnorePatterns::from_toml("force_ignore = [", Path::new("x.toml"));
        assert!(matches!(result, Err(GlossaryError::TomlParse { .. })));
    }

    #[test]
    fn test_whatlang_code_mapping() {
        assert_eq!(iso639_1("cmn"), "zh");
        assert_eq!(iso639_1("nob"), "no");
        assert_eq!(iso639_1("eng"), "en");
        assert_eq!(iso639_1("xyz"), "xyz");
    }
}
