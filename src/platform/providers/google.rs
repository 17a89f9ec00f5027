// EveTranslator - platform/providers/google.rs
//
// Free, unauthenticated Google web translation endpoint.
//
// The endpoint answers with a nested JSON array; the translation is the
// concatenation of the first string in each segment of the first element.

use super::{build_client, build_runtime, truncate_body};
use crate::core::translate::{google_source_code, google_target_code, TranslationProvider};
use crate::util::constants::GOOGLE_TRANSLATE_URL;
use crate::util::error::TranslationError;

pub struct GoogleProvider {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl GoogleProvider {
    pub const NAME: &'static str = "Google";

    pub fn new() -> Result<Self, TranslationError> {
        Ok(Self {
            client: build_client(Self::NAME)?,
            runtime: build_runtime()?,
        })
    }

    async fn request(&self, text: &str, tl: &str, sl: &str) -> Result<String, TranslationError> {
        let http_err = |e| TranslationError::Http {
            provider: Self::NAME,
            source: e,
        };

        let response = self
            .client
            .get(GOOGLE_TRANSLATE_URL)
            .query(&[("client", "gtx"), ("sl", sl), ("tl", tl), ("dt", "t"), ("q", text)])
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Status {
                provider: Self::NAME,
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        let value: serde_json::Value = response.json().await.map_err(http_err)?;
        parse_response(&value)
    }
}

impl TranslationProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<String, TranslationError> {
        let tl = google_target_code(target_lang);
        let sl = google_source_code(source_lang);
        self.runtime.block_on(self.request(text, &tl, &sl))
    }
}

/// Join the translated segments of a web endpoint response.
fn parse_response(value: &serde_json::Value) -> Result<String, TranslationError> {
    let segments = value
        .get(0)
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| TranslationError::MalformedResponse {
            provider: GoogleProvider::NAME,
            reason: "missing segment array".to_string(),
        })?;

    let text: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(serde_json::Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(TranslationError::EmptyResponse {
            provider: GoogleProvider::NAME,
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_response_joins_segments() {
        let value = json!([
            [["Jita WTB ", "吉他收", null, null, 10], ["implants", "脑插", null, null, 10]],
            null,
            "zh-CN"
        ]);
        assert_eq!(parse_response(&value).expect("valid response"), "Jita WTB implants");
    }

    #[test]
    fn test_parse_response_errors() {
        assert!(matches!(
            parse_response(&json!({"error": 1})),
            Err(TranslationError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_response(&json!([[]])),
            Err(TranslationError::EmptyResponse { .. })
        ));
    }
}
