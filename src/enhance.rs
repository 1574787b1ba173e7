//! Excerpt post-processing before publishing.
//!
//! Three passes, in order: scrub boilerplate phrases and bare URLs,
//! translate (best-effort, through the injected [`Translator`]), and
//! enforce the channel caption budget with an explicit truncation marker.
//! Translation failure is never fatal — the source-language text ships
//! instead.

use crate::translate::Translator;
use crate::utils::truncate_with_ellipsis;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

/// Call-to-action and attribution phrases that add nothing to a caption.
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(read more|click here|continue reading|subscribe now|sign up|follow us|images courtesy|via getty|advertisement|share this article|download the app)\b",
    )
    .unwrap()
});

static BARE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

// Whitespace normalization that keeps paragraph breaks.
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" *\n *").unwrap());
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Remove boilerplate phrases and inline URLs, then collapse whitespace.
pub fn sanitize(text: &str) -> String {
    let text = BOILERPLATE.replace_all(text, "");
    let text = BARE_URL.replace_all(&text, "");
    let text = SPACES.replace_all(&text, " ");
    let text = AROUND_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

pub struct Enhancer<T: Translator> {
    translator: Option<T>,
    target_lang: String,
    max_chars: usize,
}

impl<T: Translator> Enhancer<T> {
    /// `translator: None` disables the translation step entirely.
    pub fn new(translator: Option<T>, target_lang: String, max_chars: usize) -> Self {
        Self {
            translator,
            target_lang,
            max_chars,
        }
    }

    #[instrument(level = "debug", skip_all)]
    pub async fn enhance(&self, text: &str) -> String {
        let cleaned = sanitize(text);

        let translated = match &self.translator {
            Some(translator) if !cleaned.is_empty() => {
                match translator.translate(&cleaned, &self.target_lang).await {
                    Ok(translated) => translated,
                    Err(e) => {
                        warn!(error = %e, "Keeping source-language text");
                        cleaned
                    }
                }
            }
            _ => cleaned,
        };

        let out = truncate_with_ellipsis(&translated, self.max_chars);
        debug!(chars = out.chars().count(), "Enhanced excerpt");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::TranslationUnavailable;

    struct UppercaseTranslator;

    impl Translator for UppercaseTranslator {
        async fn translate(
            &self,
            text: &str,
            _target_lang: &str,
        ) -> Result<String, TranslationUnavailable> {
            Ok(text.to_uppercase())
        }
    }

    struct BrokenTranslator;

    impl Translator for BrokenTranslator {
        async fn translate(
            &self,
            _text: &str,
            _target_lang: &str,
        ) -> Result<String, TranslationUnavailable> {
            Err(TranslationUnavailable::new("backend offline"))
        }
    }

    fn no_translation() -> Enhancer<UppercaseTranslator> {
        Enhancer::new(None, String::new(), 1000)
    }

    #[test]
    fn test_sanitize_removes_boilerplate_case_insensitive() {
        let out = sanitize("The capsule drops Friday. READ MORE at the link.");
        assert!(!out.to_lowercase().contains("read more"));
        assert!(out.contains("The capsule drops Friday."));
    }

    #[test]
    fn test_sanitize_strips_bare_urls() {
        let out = sanitize("Details emerged https://example.com/x?y=1 this morning.");
        assert_eq!(out, "Details emerged this morning.");
    }

    #[test]
    fn test_sanitize_collapses_whitespace_but_keeps_paragraphs() {
        let out = sanitize("First   paragraph.\n\n\n\nSecond\t paragraph.");
        assert_eq!(out, "First paragraph.\n\nSecond paragraph.");
    }

    #[tokio::test]
    async fn test_enhance_applies_translation() {
        let enhancer = Enhancer::new(Some(UppercaseTranslator), "ru".to_string(), 1000);
        let out = enhancer.enhance("quiet luxury returns").await;
        assert_eq!(out, "QUIET LUXURY RETURNS");
    }

    #[tokio::test]
    async fn test_enhance_falls_back_on_translation_failure() {
        let enhancer = Enhancer::new(Some(BrokenTranslator), "ru".to_string(), 1000);
        let out = enhancer.enhance("quiet luxury returns").await;
        assert_eq!(out, "quiet luxury returns");
    }

    #[tokio::test]
    async fn test_enhance_without_translator_keeps_text() {
        let out = no_translation().enhance("quiet luxury returns").await;
        assert_eq!(out, "quiet luxury returns");
    }

    #[tokio::test]
    async fn test_enhance_enforces_caption_budget() {
        let enhancer: Enhancer<UppercaseTranslator> = Enhancer::new(None, String::new(), 120);
        let long = "A very long sentence about seasonal tailoring trends. ".repeat(10);
        let out = enhancer.enhance(&long).await;
        assert!(out.chars().count() <= 120);
        assert!(out.ends_with('…'));
    }

    #[tokio::test]
    async fn test_enhance_exact_budget_untouched() {
        let enhancer: Enhancer<UppercaseTranslator> = Enhancer::new(None, String::new(), 20);
        let text = "a".repeat(20);
        let out = enhancer.enhance(&text).await;
        assert_eq!(out, text);
    }
}
