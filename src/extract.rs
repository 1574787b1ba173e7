//! Generic article extraction: excerpt text and candidate images.
//!
//! One extractor serves every source. Instead of per-site selectors it
//! runs two ordered heuristic ladders over the fetched page:
//!
//! **Text**: find the primary content container (`article`, `main`,
//! known content-class patterns, then `body` as last resort), take the
//! first few substantial paragraphs, and cap the result at a word
//! boundary. Script/nav/footer/figure subtrees never contribute because
//! only `<p>` descendants without a non-content ancestor are harvested.
//!
//! **Images**: an additive search across social-preview meta tags,
//! JSON-LD structured data, in-body `<img>`/`<picture>` elements (lazy
//!-load attributes included), and inline `background-image` styles.
//! Every candidate is normalized and filtered, then the top 3 by
//! structural quality score survive.
//!
//! Failures degrade, never raise: a page that cannot be fetched or
//! parsed yields an empty [`ExtractedContent`] and the caller falls back
//! to the feed-provided summary.

use crate::config::ExtractionConfig;
use crate::models::ExtractedContent;
use crate::utils::{random_user_agent, truncate_with_ellipsis};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Ordered container heuristics; the first whose paragraph text clears
/// the configured minimum wins. `body` is the low-confidence last resort.
static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        "main",
        "[class*=\"article-body\"]",
        "[class*=\"post-body\"]",
        "[class*=\"entry-content\"]",
        "[class*=\"story\"]",
        "[class*=\"content\"]",
        "body",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static META_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "meta[property=\"og:image\"], meta[property=\"og:image:secure_url\"], \
         meta[name=\"twitter:image\"], meta[name=\"twitter:image:src\"]",
    )
    .unwrap()
});
static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type=\"application/ld+json\"]").unwrap());
static BODY_IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img, picture source").unwrap());
static STYLED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[style*=\"background-image\"]").unwrap());

static CSS_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap());
static SIZE_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(1200|1080|1920|2048|large|hero|full)").unwrap());
static CAPTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(photo|image|credit|price|source|getty|courtesy)\s*:").unwrap());

/// Elements whose subtree never counts as article content.
const NON_CONTENT: &[&str] = &[
    "nav",
    "header",
    "footer",
    "aside",
    "form",
    "figure",
    "figcaption",
    "script",
    "style",
    "noscript",
];

/// URL substrings marking chrome assets rather than editorial imagery.
const IMAGE_EXCLUSIONS: &[&str] = &[
    "logo",
    "icon",
    "avatar",
    "sprite",
    "placeholder",
    "favicon",
    "badge",
    "spinner",
];

const RASTER_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

const SCORE_META: i32 = 100;
const SCORE_JSON_LD: i32 = 80;
const SCORE_BODY: i32 = 50;
const SCORE_CSS: i32 = 30;
const BONUS_DIMENSIONS: i32 = 15;
const BONUS_SIZE_HINT: i32 = 10;
const MAX_IMAGES: usize = 3;

pub struct ArticleExtractor {
    client: reqwest::Client,
    cfg: ExtractionConfig,
}

impl ArticleExtractor {
    pub fn new(client: reqwest::Client, cfg: ExtractionConfig) -> Self {
        Self { client, cfg }
    }

    /// Fetch an article page and extract excerpt and images. Infallible
    /// by contract: anything that goes wrong degrades to an empty result.
    #[instrument(level = "info", skip(self))]
    pub async fn extract(&self, url: &str) -> ExtractedContent {
        let body = match self.fetch_page(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Article fetch failed; extraction degraded");
                return ExtractedContent::default();
            }
        };
        let content = extract_from_html(&body, url, &self.cfg);
        info!(
            excerpt_chars = content.excerpt.chars().count(),
            images = content.images.len(),
            confident = content.confident,
            "Extracted article"
        );
        content
    }

    async fn fetch_page(&self, url: &str) -> Result<String, Box<dyn Error>> {
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

/// Pure extraction over an already-fetched page; the heuristics are
/// exercised offline in tests through this entry point.
pub fn extract_from_html(html: &str, page_url: &str, cfg: &ExtractionConfig) -> ExtractedContent {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let (excerpt, confident) = extract_excerpt(&document, cfg);
    let images = discover_images(&document, base.as_ref());

    ExtractedContent {
        excerpt,
        images,
        confident,
    }
}

fn extract_excerpt(document: &Html, cfg: &ExtractionConfig) -> (String, bool) {
    let last = CONTAINER_SELECTORS.len() - 1;
    for (rank, selector) in CONTAINER_SELECTORS.iter().enumerate() {
        for container in document.select(selector) {
            let paragraphs = content_paragraphs(&container);
            let total_chars: usize = paragraphs.iter().map(|p| p.chars().count()).sum();
            if total_chars < cfg.min_container_chars {
                continue;
            }

            let picked: Vec<String> = paragraphs
                .into_iter()
                .filter(|p| p.chars().count() >= cfg.min_paragraph_chars)
                .take(cfg.max_paragraphs)
                .collect();
            if picked.is_empty() {
                continue;
            }

            let excerpt = truncate_with_ellipsis(&picked.join("\n\n"), cfg.excerpt_max_chars);
            return (excerpt, rank < last);
        }
    }
    debug!("No content container cleared the minimum text threshold");
    (String::new(), false)
}

fn content_paragraphs(container: &ElementRef) -> Vec<String> {
    container
        .select(&PARAGRAPH)
        .filter(|p| !has_noncontent_ancestor(p))
        .map(|p| {
            p.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty() && !CAPTION_LINE.is_match(text))
        .collect()
}

fn has_noncontent_ancestor(p: &ElementRef) -> bool {
    p.ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|el| NON_CONTENT.contains(&el.name()))
}

/// Ordered, additive image search with de-duplication and scoring.
fn discover_images(document: &Html, base: Option<&Url>) -> Vec<String> {
    let mut collector = ImageCollector::new(base);

    // (a) social preview meta tags: the canonical hero image.
    for meta in document.select(&META_IMAGE) {
        if let Some(content) = meta.value().attr("content") {
            collector.add(content, SCORE_META);
        }
    }

    // (b) structured data.
    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) {
            let mut urls = Vec::new();
            collect_ld_images(&value, &mut urls);
            for url in urls {
                collector.add(&url, SCORE_JSON_LD);
            }
        }
    }

    // (c) in-body images, lazy-load attributes included.
    for element in document.select(&BODY_IMAGE) {
        let attrs = element.value();
        let candidate = attrs
            .attr("src")
            .or_else(|| attrs.attr("data-src"))
            .or_else(|| attrs.attr("data-lazy-src"))
            .or_else(|| attrs.attr("data-original"))
            .map(str::to_string)
            .or_else(|| attrs.attr("srcset").and_then(first_srcset_entry));
        if let Some(raw) = candidate {
            let mut score = SCORE_BODY;
            if explicit_dimensions_large(attrs.attr("width"), attrs.attr("height")) {
                score += BONUS_DIMENSIONS;
            }
            if SIZE_HINT.is_match(&raw)
                || attrs.attr("class").is_some_and(|c| SIZE_HINT.is_match(c))
            {
                score += BONUS_SIZE_HINT;
            }
            collector.add(&raw, score);
        }
    }

    // (d) CSS background declarations, the last resort.
    for element in document.select(&STYLED) {
        if let Some(style) = element.value().attr("style") {
            for caps in CSS_URL.captures_iter(style) {
                collector.add(&caps[1], SCORE_CSS);
            }
        }
    }

    collector.into_top(MAX_IMAGES)
}

fn first_srcset_entry(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .map(str::to_string)
}

fn explicit_dimensions_large(width: Option<&str>, height: Option<&str>) -> bool {
    let parse = |v: Option<&str>| v.and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
    parse(width) >= 300 || parse(height) >= 300
}

fn collect_ld_images(value: &serde_json::Value, out: &mut Vec<String>) {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            if let Some(image) = map.get("image") {
                push_ld_image(image, out);
            }
            if let Some(graph) = map.get("@graph") {
                collect_ld_images(graph, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ld_images(item, out);
            }
        }
        _ => {}
    }
}

fn push_ld_image(value: &serde_json::Value, out: &mut Vec<String>) {
    use serde_json::Value;
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                push_ld_image(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("url") {
                out.push(s.clone());
            }
        }
        _ => {}
    }
}

struct ImageCollector<'a> {
    base: Option<&'a Url>,
    seen: HashSet<String>,
    found: Vec<(i32, String)>,
}

impl<'a> ImageCollector<'a> {
    fn new(base: Option<&'a Url>) -> Self {
        Self {
            base,
            seen: HashSet::new(),
            found: Vec::new(),
        }
    }

    fn add(&mut self, raw: &str, score: i32) {
        let Some(url) = normalize_image_url(raw, self.base) else {
            return;
        };
        if !acceptable_image_url(&url) {
            return;
        }
        if self.seen.insert(url.clone()) {
            self.found.push((score, url));
        }
    }

    /// Top `cap` distinct URLs, descending score; ties keep discovery
    /// order (the sort is stable).
    fn into_top(mut self, cap: usize) -> Vec<String> {
        self.found.sort_by(|a, b| b.0.cmp(&a.0));
        self.found.truncate(cap);
        self.found.into_iter().map(|(_, url)| url).collect()
    }
}

/// Resolve a raw image reference to an absolute HTTP(S) URL.
fn normalize_image_url(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let absolute = if let Some(rest) = raw.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()?
    } else if let Ok(url) = Url::parse(raw) {
        url
    } else {
        base?.join(raw).ok()?
    };
    if !matches!(absolute.scheme(), "http" | "https") {
        return None;
    }
    Some(absolute.to_string())
}

/// Reject chrome assets and anything without a raster extension.
fn acceptable_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    if IMAGE_EXCLUSIONS.iter().any(|bad| lower.contains(bad)) {
        return false;
    }
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    RASTER_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
