// EveTranslator - core/tokenizer.rs
//
// Opaque link span detection and placeholder substitution.
//
// The client embeds in-game hyperlinks as runs of control characters with
// the occasional printable label character wedged in. Those runs must not
// reach a translation provider, so each one is swapped for a placeholder
// and put back afterwards.
//
// Scanner states:
//   Outside -> Inside  on any control character (span starts there).
//   Inside  -> Inside  while `continues_span` holds.
//   Inside  -> Outside on a printable character not followed by a control
//                      character; that character belongs to the plain text.
// End of input closes an open span.
//
// Known limitation: a label of two or more consecutive printable characters
// splits one link into several spans. Restore is still exact.

use crate::core::model::TokenizedMessage;
use crate::util::constants::{LINK_PLACEHOLDER_PREFIX, LINK_PLACEHOLDER_SUFFIX};

/// C0 controls and the DEL/C1 block.
pub fn is_control(c: char) -> bool {
    let code = c as u32;
    code < 0x20 || (0x7F..=0x9F).contains(&code)
}

/// Transition guard while inside a span: control characters always continue
/// it; a printable character continues it only when the next character is a
/// control character.
fn continues_span(c: char, next: Option<char>) -> bool {
    is_control(c) || next.is_some_and(is_control)
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Outside,
    Inside { start: usize },
}

/// Byte ranges of every opaque link span in `text`, left to right.
fn find_spans(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut state = ScanState::Outside;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        let next = chars.get(i + 1).map(|&(_, n)| n);
        state = match state {
            ScanState::Outside if is_control(c) => ScanState::Inside { start: pos },
            ScanState::Outside => ScanState::Outside,
            ScanState::Inside { start } if continues_span(c, next) => ScanState::Inside { start },
            ScanState::Inside { start } => {
                spans.push((start, pos));
                ScanState::Outside
            }
        };
    }

    if let ScanState::Inside { start } = state {
        spans.push((start, text.len()));
    }
    spans
}

/// Placeholder prefix that does not already occur in `text`.
///
/// Ordinary chat never contains the default prefix, so it is almost always
/// `__LINK_`. Text that does gets extra leading underscores until the prefix
/// is unique, which keeps restore unambiguous.
fn placeholder_prefix(text: &str) -> String {
    let mut prefix = LINK_PLACEHOLDER_PREFIX.to_string();
    while text.contains(&prefix) {
        prefix.insert(0, '_');
    }
    prefix
}

/// Replace every opaque link span in `text` with a numbered placeholder.
///
/// Numbering restarts at 1 on every call. Text without control characters is
/// returned unchanged with an empty token list.
pub fn tokenize(text: &str) -> TokenizedMessage {
    let spans = find_spans(text);
    if spans.is_empty() {
        return TokenizedMessage {
            original: text.to_string(),
            cleaned: text.to_string(),
            tokens: Vec::new(),
        };
    }

    let prefix = placeholder_prefix(text);
    let mut cleaned = String::with_capacity(text.len() + spans.len() * 12);
    let mut tokens = Vec::with_capacity(spans.len());
    let mut last = 0;

    for (n, (start, end)) in spans.into_iter().enumerate() {
        cleaned.push_str(&text[last..start]);
        let placeholder = format!("{prefix}{}{LINK_PLACEHOLDER_SUFFIX}", n + 1);
        cleaned.push_str(&placeholder);
        tokens.push((placeholder, text[start..end].to_string()));
        last = end;
    }
    cleaned.push_str(&text[last..]);

    TokenizedMessage {
        original: text.to_string(),
        cleaned,
        tokens,
    }
}

/// Put every placeholder in `text` back to its original span.
pub fn restore(text: &str, tokens: &[(String, String)]) -> String {
    tokens
        .iter()
        .fold(text.to_string(), |acc, (placeholder, original)| {
            acc.replace(placeholder.as_str(), original)
        })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_untouched() {
        for text in ["", "hello", "o7 fleet", "吉他收脑插", "a > b [ c ]"] {
            let t = tokenize(text);
            assert_eq!(t.cleaned, text);
            assert!(t.tokens.is_empty(), "no tokens expected for {text:?}");
            assert!(!t.has_tokens());
        }
    }

    #[test]
    fn test_tokenize_click_here_example() {
        let input = "Click \x1Ahere\x1A for info";
        let t = tokenize(input);
        assert_eq!(t.cleaned, "Click __LINK_1__here__LINK_2__ for info");
        assert_eq!(t.tokens.len(), 2);
        assert_eq!(t.tokens[0], ("__LINK_1__".to_string(), "\x1A".to_string()));
        assert_eq!(t.restore(&t.cleaned), input);
    }

    /// A single printable label character sandwiched between control
    /// characters belongs to the span.
    #[test]
    fn test_single_printable_swallowed_mid_span() {
        let input = "Doctrine/\u{0e}T\x1A\x03 *WC CFI";
        let t = tokenize(input);
        assert_eq!(t.cleaned, "Doctrine/__LINK_1__ *WC CFI");
        assert_eq!(t.tokens[0].1, "\u{0e}T\x1A\x03");
        assert_eq!(t.restore(&t.cleaned), input);
    }

    #[test]
    fn test_span_at_end_of_input() {
        let t = tokenize("see \x02\x03");
        assert_eq!(t.cleaned, "see __LINK_1__");
        assert_eq!(t.tokens[0].1, "\x02\x03");
    }

    #[test]
    fn test_c1_controls_start_a_span() {
        let t = tokenize("x\u{85}\u{9f}y z");
        assert_eq!(t.cleaned, "x__LINK_1__y z");
    }

    /// CJK text after a link stays in the translatable text.
    #[test]
    fn test_cjk_after_span_is_not_swallowed() {
        let t = tokenize("\x1A吉他收");
        assert_eq!(t.cleaned, "__LINK_1__吉他收");
    }

    #[test]
    fn test_counter_restarts_per_call() {
        let first = tokenize("\x01a b");
        let second = tokenize("\x01a b");
        assert_eq!(first.cleaned, second.cleaned);
        assert!(second.cleaned.starts_with("__LINK_1__"));
    }

    /// Text that already contains the placeholder prefix still round-trips.
    #[test]
    fn test_placeholder_collision_with_content() {
        let input = "literal __LINK_1__ then \x1A link";
        let t = tokenize(input);
        assert!(t.cleaned.contains("___LINK_1__"), "prefix must be widened: {}", t.cleaned);
        assert_eq!(t.restore(&t.cleaned), input);
    }

    #[test]
    fn test_round_trip_many_spans() {
        let input: String = (0..15).map(|i| format!("w{i} \x1A\x02 ")).collect();
        let t = tokenize(&input);
        assert_eq!(t.tokens.len(), 15);
        assert!(t.cleaned.contains("__LINK_10__"));
        assert_eq!(t.restore(&t.cleaned), input);
    }

    #[test]
    fn test_round_trip_mixed_content() {
        let samples = [
            "\x00",
            "\x7f\x7f\x7f",
            "a\x1ab\x1ac\x1a",
            "\x1aé\x1a end",
            "前\x0e舰队\x1a\x03后",
            "__LINK_1__\x01",
            "___LINK_\x01_",
        ];
        for s in samples {
            let t = tokenize(s);
            assert_eq!(t.restore(&t.cleaned), s, "round trip failed for {s:?}");
            assert!(
                !t.cleaned.chars().any(is_control),
                "control characters left in {:?}",
                t.cleaned
            );
        }
    }
}
