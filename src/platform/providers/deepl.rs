// EveTranslator - platform/providers/deepl.rs
//
// DeepL REST API v2, selected when the user configures an API key.
//
// The source hint is only sent when DeepL accepts it; otherwise DeepL
// detects the language itself. The key is never logged.

use super::{build_client, build_runtime, truncate_body};
use crate::core::translate::{deepl_source_code, deepl_target_code, TranslationProvider};
use crate::util::constants::{DEEPL_FREE_KEY_SUFFIX, DEEPL_FREE_URL, DEEPL_PRO_URL};
use crate::util::error::TranslationError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

pub struct DeepLProvider {
    auth_header: String,
    endpoint: &'static str,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl DeepLProvider {
    pub const NAME: &'static str = "DeepL";

    pub fn new(api_key: &str) -> Result<Self, TranslationError> {
        let api_key = api_key.trim();
        Ok(Self {
            auth_header: format!("DeepL-Auth-Key {api_key}"),
            endpoint: endpoint_for_key(api_key),
            client: build_client(Self::NAME)?,
            runtime: build_runtime()?,
        })
    }

    async fn request(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<String, TranslationError> {
        let mut form = vec![("text", text), ("target_lang", target)];
        if let Some(source) = source {
            form.push(("source_lang", source));
        }

        let response = self
            .client
            .post(self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .form(&form)
            .send()
            .await
            .map_err(|e| TranslationError::Http {
                provider: Self::NAME,
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Status {
                provider: Self::NAME,
                status: status.as_u16(),
                message: status_message(status.as_u16(), &body),
            });
        }

        let parsed: TranslateResponse =
            response
                .json()
                .await
                .map_err(|e| TranslationError::MalformedResponse {
                    provider: Self::NAME,
                    reason: e.to_string(),
                })?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(TranslationError::EmptyResponse {
                provider: Self::NAME,
            })
    }
}

impl TranslationProvider for DeepLProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<String, TranslationError> {
        let target = deepl_target_code(target_lang).ok_or_else(|| {
            TranslationError::InvalidLanguage {
                provider: Self::NAME,
                code: target_lang.to_string(),
            }
        })?;
        let source = deepl_source_code(source_lang);
        if source.is_none() {
            tracing::trace!(source = ?source_lang, "Source hint omitted; DeepL will detect");
        }
        self.runtime
            .block_on(self.request(text, &target, source.as_deref()))
    }
}

/// Free-tier keys end in `:fx` and must use the free endpoint.
fn endpoint_for_key(api_key: &str) -> &'static str {
    if api_key.ends_with(DEEPL_FREE_KEY_SUFFIX) {
        DEEPL_FREE_URL
    } else {
        DEEPL_PRO_URL
    }
}

/// Readable message for the statuses DeepL documents, else the body.
fn status_message(status: u16, body: &str) -> String {
    match status {
        403 => "authorization failed, check the DeepL API key".to_string(),
        429 => "too many requests, slow down".to_string(),
        456 => "character quota exceeded for this billing period".to_string(),
        _ => truncate_body(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_key() {
        assert_eq!(endpoint_for_key("abc-123:fx"), DEEPL_FREE_URL);
        assert_eq!(endpoint_for_key("abc-123"), DEEPL_PRO_URL);
    }

    #[test]
    fn test_status_message() {
        assert!(status_message(403, "").contains("API key"));
        assert!(status_message(456, "").contains("quota"));
        assert!(status_message(429, "").contains("too many"));
        assert_eq!(status_message(500, " boom "), "boom");
    }

    /// An empty target is rejected before any request is built.
    #[test]
    fn test_empty_target_is_invalid() {
        let provider = DeepLProvider::new("abc:fx").expect("provider builds offline");
        let result = provider.translate("hello", "  ", None);
        assert!(matches!(result, Err(TranslationError::InvalidLanguage { .. })));
    }

    #[test]
    fn test_response_shape() {
        let parsed: TranslateResponse = serde_json::from_str(
            r#"{"translations":[{"detected_source_language":"ZH","text":"Jita WTB"}]}"#,
        )
        .expect("valid response");
        assert_eq!(parsed.translations[0].text, "Jita WTB");
    }
}
