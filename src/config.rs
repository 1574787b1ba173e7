//! Runtime configuration loaded from YAML.
//!
//! Every tunable — sources, keyword sets, extraction budgets, publishing
//! limits — lives in plain serde structs that are passed into component
//! constructors at startup. Nothing in the pipeline reads configuration
//! from globals, which keeps ranking and extraction unit-testable against
//! synthetic configs.
//!
//! A built-in default configuration covers the common fashion-news setup,
//! so the binary runs without a config file; `--config` overrides it.

use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::info;

/// A single polled source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Source {
    /// Display name used in logs and score explanations.
    pub name: String,
    /// Feed URL or listing page URL.
    pub endpoint: String,
    /// How the endpoint is read.
    pub kind: SourceKind,
    /// Priority weight; larger values boost this source's items.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// For `listing` sources: substring an article link's path must
    /// contain (e.g. `/article/`). The only per-source scraping glue.
    #[serde(default)]
    pub link_pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Listing,
}

fn default_priority() -> u32 {
    1
}

/// Keyword sets and weights for the relevance gate and scorer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RankingConfig {
    /// An item must contain at least one of these (title or summary).
    pub positive: Vec<String>,
    /// An item must contain none of these.
    pub stoplist: Vec<String>,
    /// Terms that earn the larger bonus on top of the positive hit.
    pub high_value: Vec<String>,
    /// Curated brand/entity list.
    pub brands: Vec<String>,
    /// Items older than this are dropped when a timestamp is available.
    pub freshness_hours: i64,
    /// How many top-ranked items are carried forward per run.
    pub max_selected: usize,
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub keyword: i64,
    pub high_value: i64,
    pub brand: i64,
    pub priority: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keyword: 10,
            high_value: 25,
            brand: 15,
            priority: 5,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            positive: [
                "collaboration",
                "collection",
                "runway",
                "couture",
                "capsule",
                "sneaker",
                "fashion week",
                "campaign",
                "debut",
                "launch",
                "atelier",
                "menswear",
                "womenswear",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            stoplist: ["movie", "film review", "horoscope", "recipe", "obituary"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            high_value: ["exclusive", "limited", "first look", "archival"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            brands: [
                "gucci",
                "prada",
                "dior",
                "chanel",
                "balenciaga",
                "louis vuitton",
                "nike",
                "adidas",
                "supreme",
                "off-white",
                "jacquemus",
                "loewe",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            freshness_hours: 24,
            max_selected: 3,
            weights: ScoreWeights::default(),
        }
    }
}

/// Budgets for article text and image extraction.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum total paragraph text a container must hold to be chosen.
    pub min_container_chars: usize,
    /// Minimum length of an individual paragraph worth quoting.
    pub min_paragraph_chars: usize,
    /// How many qualifying paragraphs make up the excerpt.
    pub max_paragraphs: usize,
    /// Hard cap on the excerpt, enforced at a word boundary.
    pub excerpt_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_container_chars: 160,
            min_paragraph_chars: 45,
            max_paragraphs: 4,
            excerpt_max_chars: 700,
        }
    }
}

/// Delivery limits and network budgets.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishingConfig {
    /// Caption ceiling for the channel (Telegram photo captions allow
    /// 1024; keep headroom).
    pub caption_limit: usize,
    /// How many items may be published in one run.
    pub max_published_per_run: usize,
    /// Most recent entries read per source.
    pub max_items_per_source: usize,
    /// Per-request timeout for every network call.
    pub request_timeout_secs: u64,
    /// Total delivery attempts per fidelity rung.
    pub retry_max_attempts: usize,
    /// Base backoff delay between delivery attempts.
    pub retry_base_delay_ms: u64,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            caption_limit: 1000,
            max_published_per_run: 1,
            max_items_per_source: 15,
            request_timeout_secs: 20,
            retry_max_attempts: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

/// Optional translation backend (LibreTranslate-compatible).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    pub endpoint: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_target_lang() -> String {
    "ru".to_string()
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub sources: Vec<Source>,
    pub ranking: RankingConfig,
    pub extraction: ExtractionConfig,
    pub publishing: PublishingConfig,
    /// Days a publish record is kept before pruning.
    pub retention_days: i64,
    /// Absent section disables the translation step entirely.
    pub translation: Option<TranslationConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                Source {
                    name: "Vogue".to_string(),
                    endpoint: "https://www.vogue.com/feed/rss".to_string(),
                    kind: SourceKind::Feed,
                    priority: 3,
                    link_pattern: None,
                },
                Source {
                    name: "Hypebeast".to_string(),
                    endpoint: "https://hypebeast.com/feed".to_string(),
                    kind: SourceKind::Feed,
                    priority: 2,
                    link_pattern: None,
                },
                Source {
                    name: "Fashionista".to_string(),
                    endpoint: "https://fashionista.com/.rss/full/".to_string(),
                    kind: SourceKind::Feed,
                    priority: 2,
                    link_pattern: None,
                },
            ],
            ranking: RankingConfig::default(),
            extraction: ExtractionConfig::default(),
            publishing: PublishingConfig::default(),
            retention_days: 7,
            translation: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {}", path, e))?;
        let config: AppConfig =
            serde_yaml::from_str(&raw).map_err(|e| format!("invalid config {}: {}", path, e))?;
        info!(path, sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with. Called before
    /// any network activity so bad configs fail fast with a non-zero exit.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.sources.is_empty() {
            return Err("no sources configured".into());
        }
        for source in &self.sources {
            if source.endpoint.is_empty() {
                return Err(format!("source {} has an empty endpoint", source.name).into());
            }
            if source.kind == SourceKind::Listing && source.link_pattern.is_none() {
                return Err(
                    format!("listing source {} needs a link_pattern", source.name).into(),
                );
            }
        }
        if self.ranking.positive.is_empty() {
            return Err("ranking.positive keyword set is empty".into());
        }
        if self.ranking.freshness_hours <= 0 {
            return Err("ranking.freshness_hours must be positive".into());
        }
        if self.publishing.caption_limit == 0 || self.publishing.retry_max_attempts == 0 {
            return Err("publishing limits must be non-zero".into());
        }
        if self.retention_days <= 0 {
            return Err("retention_days must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip_with_partial_file() {
        let yaml = r#"
sources:
  - name: Example
    endpoint: https://example.com/feed
    kind: feed
    priority: 4
ranking:
  positive: [collaboration]
  stoplist: [movie]
retention_days: 3
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].priority, 4);
        assert_eq!(config.ranking.positive, vec!["collaboration"]);
        assert_eq!(config.retention_days, 3);
        // untouched sections fall back to defaults
        assert_eq!(config.publishing.max_published_per_run, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_listing_source_requires_link_pattern() {
        let mut config = AppConfig::default();
        config.sources.push(Source {
            name: "Bad".to_string(),
            endpoint: "https://example.com/fashion".to_string(),
            kind: SourceKind::Listing,
            priority: 1,
            link_pattern: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_positive_keywords_rejected() {
        let mut config = AppConfig::default();
        config.ranking.positive.clear();
        assert!(config.validate().is_err());
    }
}
