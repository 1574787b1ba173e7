//! Delivery channel abstraction and the Telegram Bot API implementation.
//!
//! The channel exposes exactly three primitives — grouped photos with one
//! caption, a single photo with caption, and plain text — which the
//! publisher sequences through as its fidelity ladder. Errors are split
//! into transport failures (worth retrying at the same fidelity) and
//! non-success responses (fall through to the next fidelity).

use crate::utils::truncate_for_log;
use serde_json::json;
use std::fmt;
use tracing::debug;

/// Why a delivery attempt failed.
#[derive(Debug)]
pub enum DeliveryError {
    /// Network-level failure: timeout, refused connection, DNS. Transient.
    Transport(String),
    /// The channel answered with a non-success status.
    Status { code: u16, body: String },
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Status { code, body } => write!(f, "channel returned {code}: {body}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// A channel that can receive the three delivery fidelities.
pub trait Channel {
    async fn send_media_group(
        &self,
        caption: &str,
        image_urls: &[String],
    ) -> Result<(), DeliveryError>;

    async fn send_photo(&self, caption: &str, image_url: &str) -> Result<(), DeliveryError>;

    async fn send_message(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Telegram Bot API client for one target chat.
pub struct TelegramChannel {
    client: reqwest::Client,
    api_base: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(client: reqwest::Client, bot_token: &str, chat_id: &str) -> Self {
        Self {
            client,
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
            chat_id: chat_id.to_string(),
        }
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<(), DeliveryError> {
        let url = format!("{}/{}", self.api_base, method);
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(method, "Channel acknowledged delivery");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Status {
                code: status.as_u16(),
                body: truncate_for_log(&body, 200),
            })
        }
    }
}

impl Channel for TelegramChannel {
    async fn send_media_group(
        &self,
        caption: &str,
        image_urls: &[String],
    ) -> Result<(), DeliveryError> {
        let media: Vec<serde_json::Value> = image_urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                if i == 0 {
                    // Caption rides on the first photo only.
                    json!({"type": "photo", "media": url, "caption": caption, "parse_mode": "HTML"})
                } else {
                    json!({"type": "photo", "media": url})
                }
            })
            .collect();
        self.call(
            "sendMediaGroup",
            json!({"chat_id": self.chat_id, "media": media}),
        )
        .await
    }

    async fn send_photo(&self, caption: &str, image_url: &str) -> Result<(), DeliveryError> {
        self.call(
            "sendPhoto",
            json!({
                "chat_id": self.chat_id,
                "photo": image_url,
                "caption": caption,
                "parse_mode": "HTML",
            }),
        )
        .await
    }

    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
        )
        .await
    }
}

/// Compose the caption: bold escaped title, blank line, excerpt. The
/// excerpt is budgeted so the whole caption stays within `limit`
/// characters as the channel counts them (post-parse, tags excluded).
pub fn format_caption(title: &str, excerpt: &str, limit: usize) -> String {
    let title = crate::utils::truncate_with_ellipsis(title.trim(), limit);
    let title_chars = title.chars().count();

    let excerpt_budget = limit.saturating_sub(title_chars + 2);
    let excerpt = crate::utils::truncate_with_ellipsis(excerpt.trim(), excerpt_budget);

    let title = html_escape::encode_text(&title);
    if excerpt.is_empty() {
        format!("<b>{title}</b>")
    } else {
        let excerpt = html_escape::encode_text(&excerpt);
        format!("<b>{title}</b>\n\n{excerpt}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_caption_bold_title_and_body() {
        let caption = format_caption("Big Reveal", "The details follow.", 1000);
        assert_eq!(caption, "<b>Big Reveal</b>\n\nThe details follow.");
    }

    #[test]
    fn test_format_caption_escapes_html() {
        let caption = format_caption("A <b>risky</b> & bold title", "1 < 2", 1000);
        assert!(caption.contains("&lt;b&gt;risky&lt;/b&gt;"));
        assert!(caption.contains("&amp;"));
        assert!(caption.contains("1 &lt; 2"));
    }

    #[test]
    fn test_format_caption_title_only() {
        assert_eq!(format_caption("Just a title", "", 1000), "<b>Just a title</b>");
    }

    #[test]
    fn test_format_caption_respects_limit() {
        let excerpt = "word ".repeat(400);
        let caption = format_caption("Title", &excerpt, 200);
        // strip markup the channel does not count
        let visible = caption.replace("<b>", "").replace("</b>", "");
        assert!(visible.chars().count() <= 200);
        assert!(visible.ends_with('…'));
    }

    #[test]
    fn test_delivery_error_transience() {
        assert!(DeliveryError::Transport("timeout".into()).is_transient());
        assert!(
            !DeliveryError::Status {
                code: 400,
                body: "bad request".into()
            }
            .is_transient()
        );
    }
}
