//! Translation as an injected capability.
//!
//! The pipeline never translates text itself; it delegates to whatever
//! implements [`Translator`] and treats failure as a soft condition: the
//! enhancer catches [`TranslationUnavailable`] and keeps the original
//! text. The bundled implementation talks to a LibreTranslate-compatible
//! HTTP endpoint; swapping backends means swapping one constructor.

use crate::config::TranslationConfig;
use crate::retry::{retry_async, RetryPolicy};
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tracing::{instrument, warn};

/// The translation step could not produce a result. Always recoverable:
/// callers degrade to the untranslated text.
#[derive(Debug)]
pub struct TranslationUnavailable {
    reason: String,
}

impl TranslationUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TranslationUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "translation unavailable: {}", self.reason)
    }
}

impl std::error::Error for TranslationUnavailable {}

/// Something that can translate text into a target language.
pub trait Translator {
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, TranslationUnavailable>;
}

/// Client for a LibreTranslate-compatible `POST /translate` endpoint.
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(cfg: &TranslationConfig, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/translate", cfg.endpoint.trim_end_matches('/')),
            api_key: cfg.api_key.clone(),
            retry: RetryPolicy::new(2, Duration::from_secs(1)),
        })
    }

    async fn request(&self, text: &str, target_lang: &str) -> Result<String, Box<dyn Error>> {
        let mut body = serde_json::json!({
            "q": text,
            "source": "auto",
            "target": target_lang,
            "format": "text",
        });
        if let Some(key) = &self.api_key {
            body["api_key"] = serde_json::Value::String(key.clone());
        }

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}").into());
        }
        let parsed: TranslateResponse = response.json().await?;
        Ok(parsed.translated_text)
    }
}

impl Translator for HttpTranslator {
    #[instrument(level = "debug", skip_all, fields(target_lang))]
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, TranslationUnavailable> {
        retry_async(
            self.retry,
            || self.request(text, target_lang),
            |_| true,
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "Translation backend unreachable");
            TranslationUnavailable::new(e.to_string())
        })
    }
}
