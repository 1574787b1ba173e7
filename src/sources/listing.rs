//! Listing-page scanning for sources without a feed.
//!
//! A listing source is just an HTML page full of article links. Instead
//! of per-site selectors, the scan walks every anchor and keeps the ones
//! that look like articles: same host as the listing page, path matching
//! the source's configured `link_pattern`, and headline-length anchor
//! text. Adding a source is a config entry, not code.

use crate::config::Source;
use crate::models::CandidateItem;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::warn;
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Anchor text shorter than this is navigation, not a headline.
const MIN_TITLE_CHARS: usize = 15;

pub fn parse(html: &str, source: &Source) -> Vec<CandidateItem> {
    let base = match Url::parse(&source.endpoint) {
        Ok(base) => base,
        Err(e) => {
            warn!(error = %e, endpoint = %source.endpoint, "Listing endpoint is not a valid URL");
            return Vec::new();
        }
    };
    let pattern = source.link_pattern.as_deref().unwrap_or("/");

    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.host_str() != base.host_str() {
            continue;
        }
        if !resolved.path().contains(pattern) {
            continue;
        }

        let title = anchor
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if title.chars().count() < MIN_TITLE_CHARS {
            continue;
        }

        let url = resolved.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }

        items.push(CandidateItem {
            title,
            url,
            summary: None,
            published_at: None,
            source_name: source.name.clone(),
            source_priority: source.priority,
        });
    }

    items
}
