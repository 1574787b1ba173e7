//! Core data types flowing through the pipeline.
//!
//! This module defines the process-local data carried between pipeline
//! stages, plus the one durable identity: the article [`Fingerprint`].
//!
//! - [`CandidateItem`]: an article discovered in a poll cycle, not yet
//!   filtered or published
//! - [`ExtractedContent`]: excerpt and images pulled from an article page
//! - [`Fingerprint`]: deterministic digest identifying a unique article
//!   for cross-run dedup
//!
//! Candidates and extracted content are discarded after one run; only the
//! fingerprint of a successfully published article is persisted.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// An article discovered from a source during one poll cycle.
///
/// The source's name and priority weight are copied in at discovery time
/// so ranking and logging never need to reach back into configuration.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    /// Article headline as reported by the source.
    pub title: String,
    /// Canonical article URL.
    pub url: String,
    /// Feed-provided summary, used as the excerpt fallback when page
    /// extraction comes up empty.
    pub summary: Option<String>,
    /// Publish timestamp when the source reports one. Absence is handled
    /// fail-open by the freshness filter.
    pub published_at: Option<DateTime<Utc>>,
    /// Name of the originating source.
    pub source_name: String,
    /// Priority weight of the originating source.
    pub source_priority: u32,
}

impl CandidateItem {
    /// Compute the dedup fingerprint for this candidate.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.url, &self.title)
    }
}

/// Excerpt and image URLs extracted from an article page.
///
/// Either side may be empty; partial results are the normal degraded mode
/// when a page resists extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    /// Cleaned text excerpt, already capped at the configured length.
    pub excerpt: String,
    /// Up to three distinct image URLs in descending quality-score order.
    pub images: Vec<String>,
    /// False when the excerpt came from the whole-page fallback (or not
    /// at all) rather than a recognized content container.
    pub confident: bool,
}

/// Deterministic digest identifying a unique article across runs.
///
/// Stored as lowercase hex SHA-256 so the value doubles as a readable
/// database key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint for an article URL.
///
/// The digest is taken over the normalized URL (see [`normalize_url`]) so
/// that query-string noise and fragment differences collapse to a single
/// identity. URLs that do not parse are hashed raw together with the
/// title, which is the best stable identity available for sources without
/// well-formed links.
pub fn fingerprint(url: &str, title: &str) -> Fingerprint {
    let canonical =
        normalize_url(url).unwrap_or_else(|| format!("{}\n{}", url.trim(), title.trim()));
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint(out)
}

/// Canonicalize an article URL for fingerprinting.
///
/// Normalization rule: scheme and host are lowercased (the parser does
/// this), the fragment is dropped, tracking query parameters are removed,
/// surviving query pairs are sorted, and a trailing slash is trimmed from
/// non-root paths. Returns `None` for non-HTTP(S) or unparsable input.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut parsed = Url::parse(raw.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.set_fragment(None);

    let mut kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        kept.sort();
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &kept {
            ser.append_pair(k, v);
        }
        let query = ser.finish();
        parsed.set_query(Some(&query));
    }

    if parsed.path().len() > 1 && parsed.path().ends_with('/') {
        let trimmed = parsed.path().trim_end_matches('/').to_string();
        parsed.set_path(&trimmed);
    }

    Some(parsed.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_")
        || matches!(
            key,
            "fbclid" | "gclid" | "igshid" | "mc_cid" | "mc_eid" | "ref_src" | "cmpid"
        )
}
