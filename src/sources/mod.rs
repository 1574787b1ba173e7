//! Source readers for discovering candidate articles.
//!
//! Two source kinds are supported, selected by configuration:
//!
//! | Kind | Module | Method |
//! |---------|-------------|----------------------------------------|
//! | feed | [`feed`] | RSS 2.0 / Atom via `quick_xml::de` |
//! | listing | [`listing`] | HTML page scan for article-like anchors |
//!
//! The reader's contract is deliberately forgiving: a source that cannot
//! be fetched or parsed yields an empty list and a warning, never an
//! error — one dead site must not take down the whole poll cycle. There
//! is no retry at this level either; a missed cycle is retried by the
//! next scheduled run.

use crate::config::{Source, SourceKind};
use crate::models::CandidateItem;
use crate::utils::random_user_agent;
use itertools::Itertools;
use reqwest::header::USER_AGENT;
use std::error::Error;
use tracing::{info, instrument, warn};

pub mod feed;
pub mod listing;

/// Fetches one source and turns its payload into candidate items.
pub struct SourceReader {
    client: reqwest::Client,
    max_items: usize,
}

impl SourceReader {
    pub fn new(client: reqwest::Client, max_items: usize) -> Self {
        Self { client, max_items }
    }

    /// Read the N most recent entries from a source. Infallible by
    /// contract: failures degrade to an empty list.
    #[instrument(level = "info", skip(self, source), fields(source = %source.name))]
    pub async fn fetch(&self, source: &Source) -> Vec<CandidateItem> {
        let body = match self.get_text(&source.endpoint).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, endpoint = %source.endpoint, "Source unavailable; skipping");
                return Vec::new();
            }
        };

        let parsed = match source.kind {
            SourceKind::Feed => feed::parse(&body, source),
            SourceKind::Listing => listing::parse(&body, source),
        };
        // Feeds occasionally repeat an entry; keep the first occurrence.
        let mut items: Vec<CandidateItem> = parsed
            .into_iter()
            .unique_by(|item| item.url.clone())
            .collect();
        items.truncate(self.max_items);

        info!(count = items.len(), "Indexed source");
        items
    }

    async fn get_text(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}").into());
        }
        Ok(response.text().await?)
    }
}
