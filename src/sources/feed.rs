//! RSS 2.0 and Atom feed parsing.
//!
//! Feeds are deserialized with `quick_xml::de` into minimal serde structs:
//! only the fields the pipeline needs (title, link, summary, timestamp)
//! are modeled. RSS is tried first, then Atom. Publishers ship RFC-2822
//! dates in RSS and RFC-3339 in Atom, with plenty of sloppy variations;
//! anything unparsable becomes `None` and is handled fail-open downstream.

use crate::config::Source;
use crate::models::CandidateItem;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse a feed payload into candidate items, newest-first as delivered.
pub fn parse(xml: &str, source: &Source) -> Vec<CandidateItem> {
    let cleaned = scrub_html_entities(xml);

    if let Ok(rss) = quick_xml::de::from_str::<Rss>(&cleaned) {
        if !rss.channel.items.is_empty() {
            return rss
                .channel
                .items
                .into_iter()
                .filter_map(|item| rss_item_to_candidate(item, source))
                .collect();
        }
    }

    if let Ok(atom) = quick_xml::de::from_str::<AtomFeed>(&cleaned) {
        if !atom.entries.is_empty() {
            return atom
                .entries
                .into_iter()
                .filter_map(|entry| atom_entry_to_candidate(entry, source))
                .collect();
        }
    }

    warn!(source = %source.name, "Feed payload matched neither RSS nor Atom");
    Vec::new()
}

fn rss_item_to_candidate(item: RssItem, source: &Source) -> Option<CandidateItem> {
    let title = clean_text(item.title.as_deref()?);
    let url = item.link?.trim().to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }
    Some(CandidateItem {
        title,
        url,
        summary: item
            .description
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty()),
        published_at: item.pub_date.as_deref().and_then(parse_feed_date),
        source_name: source.name.clone(),
        source_priority: source.priority,
    })
}

fn atom_entry_to_candidate(entry: AtomEntry, source: &Source) -> Option<CandidateItem> {
    let title = clean_text(entry.title.as_deref()?);
    // Prefer the alternate link; fall back to the first link with an href.
    let url = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or(entry.links.first())
        .and_then(|l| l.href.clone())?
        .trim()
        .to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }
    let published = entry.published.or(entry.updated);
    Some(CandidateItem {
        title,
        url,
        summary: entry
            .summary
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty()),
        published_at: published.as_deref().and_then(parse_feed_date),
        source_name: source.name.clone(),
        source_priority: source.priority,
    })
}

/// Parse a feed timestamp, RFC-2822 (`Mon, 06 May 2026 10:00:00 GMT`) or
/// RFC-3339 (`2026-05-06T10:00:00Z`).
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    debug!(raw, "Unparsable feed timestamp");
    None
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip markup and entities from feed-provided text (titles and
/// descriptions routinely carry embedded HTML).
fn clean_text(raw: &str) -> String {
    let no_tags = TAG_RE.replace_all(raw, " ");
    let decoded = html_escape::decode_html_entities(&no_tags);
    WS_RE.replace_all(decoded.trim(), " ").to_string()
}

/// Named HTML entities inside element text break strict XML parsing;
/// replace the usual suspects before deserializing.
fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
