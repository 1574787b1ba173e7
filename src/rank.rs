//! Relevance filtering and candidate ranking.
//!
//! The engine applies, in order: a two-sided topical gate (at least one
//! positive keyword AND zero stoplist keywords — both sides evaluated
//! independently), a fail-open freshness horizon, a weighted score, a
//! deterministic descending sort, and within-run near-duplicate title
//! suppression. Only the top M survivors are carried forward.
//!
//! All keyword sets and weights are injected through [`RankingConfig`],
//! so the logic tests cleanly against synthetic configurations.

use crate::config::RankingConfig;
use crate::models::CandidateItem;
use chrono::{Duration, Utc};
use tracing::{debug, info, instrument};

pub struct RankingEngine {
    cfg: RankingConfig,
}

impl RankingEngine {
    /// Keyword sets are lowercased once at construction; matching is
    /// case-insensitive substring containment over title + summary.
    pub fn new(mut cfg: RankingConfig) -> Self {
        for set in [
            &mut cfg.positive,
            &mut cfg.stoplist,
            &mut cfg.high_value,
            &mut cfg.brands,
        ] {
            for term in set.iter_mut() {
                *term = term.to_lowercase();
            }
            set.retain(|t| !t.is_empty());
        }
        Self { cfg }
    }

    /// Filter and order candidates; the result is deterministic for a
    /// given input order.
    #[instrument(level = "info", skip_all, fields(input = candidates.len()))]
    pub fn filter_and_rank(&self, candidates: Vec<CandidateItem>) -> Vec<CandidateItem> {
        let now = Utc::now();
        let horizon = Duration::hours(self.cfg.freshness_hours);

        let mut scored: Vec<(i64, CandidateItem)> = Vec::new();
        for item in candidates {
            let haystack = format!(
                "{} {}",
                item.title,
                item.summary.as_deref().unwrap_or_default()
            )
            .to_lowercase();

            if !self.passes_topic_gate(&haystack) {
                debug!(title = %item.title, "Dropped by topical gate");
                continue;
            }

            // Fail-open: no timestamp means no freshness verdict.
            if let Some(published) = item.published_at {
                if now.signed_duration_since(published) > horizon {
                    debug!(title = %item.title, %published, "Dropped as stale");
                    continue;
                }
            }

            let score = self.score(&haystack, item.source_priority);
            scored.push((score, item));
        }

        // Stable sort: ties keep source-priority order, then input order.
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.source_priority.cmp(&a.1.source_priority))
        });

        let mut ranked = collapse_near_duplicates(scored);
        ranked.truncate(self.cfg.max_selected);
        info!(selected = ranked.len(), "Ranking complete");
        ranked
    }

    /// Both sides must hold: one positive hit, zero stop hits.
    fn passes_topic_gate(&self, haystack: &str) -> bool {
        let has_positive = self.cfg.positive.iter().any(|t| haystack.contains(t.as_str()));
        let has_stop = self.cfg.stoplist.iter().any(|t| haystack.contains(t.as_str()));
        has_positive && !has_stop
    }

    fn score(&self, haystack: &str, priority: u32) -> i64 {
        let w = &self.cfg.weights;
        count_hits(haystack, &self.cfg.positive) * w.keyword
            + count_hits(haystack, &self.cfg.high_value) * w.high_value
            + count_hits(haystack, &self.cfg.brands) * w.brand
            + i64::from(priority) * w.priority
    }
}

fn count_hits(haystack: &str, terms: &[String]) -> i64 {
    terms.iter().filter(|t| haystack.contains(t.as_str())).count() as i64
}

/// Collapse items whose normalized titles are substrings of one another,
/// keeping the highest-ranked survivor. Independent of the cross-run
/// dedup store: this only prevents two near-identical headlines landing
/// in the same batch.
fn collapse_near_duplicates(scored: Vec<(i64, CandidateItem)>) -> Vec<CandidateItem> {
    let mut kept: Vec<(String, CandidateItem)> = Vec::new();
    for (_, item) in scored {
        let normalized = normalize_title(&item.title);
        if !normalized.is_empty()
            && kept
                .iter()
                .any(|(k, _)| !k.is_empty() && (k.contains(&normalized) || normalized.contains(k)))
        {
            debug!(title = %item.title, "Collapsed near-duplicate headline");
            continue;
        }
        kept.push((normalized, item));
    }
    kept.into_iter().map(|(_, item)| item).collect()
}

fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreWeights;

    fn synthetic_config() -> RankingConfig {
        RankingConfig {
            positive: vec!["collaboration".into(), "exclusive".into()],
            stoplist: vec!["movie".into()],
            high_value: vec!["exclusive".into()],
            brands: vec!["brand x".into()],
            freshness_hours: 24,
            max_selected: 3,
            weights: ScoreWeights::default(),
        }
    }

    fn candidate(title: &str) -> CandidateItem {
        CandidateItem {
            title: title.to_string(),
            url: format!(
                "https://example.com/{}",
                title.to_lowercase().replace(' ', "-")
            ),
            summary: None,
            published_at: None,
            source_name: "Test".to_string(),
            source_priority: 1,
        }
    }

    #[test]
    fn test_two_sided_gate_excludes_stop_keyword() {
        let engine = RankingEngine::new(synthetic_config());
        let ranked = engine.filter_and_rank(vec![
            candidate("A new collaboration inspired by the movie"),
            candidate("A new collaboration with an atelier"),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "A new collaboration with an atelier");
    }

    #[test]
    fn test_gate_requires_positive_keyword() {
        let engine = RankingEngine::new(synthetic_config());
        let ranked = engine.filter_and_rank(vec![candidate("Quarterly earnings call scheduled")]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_high_value_term_scores_strictly_higher() {
        let engine = RankingEngine::new(synthetic_config());
        let plain = candidate("Brand Y announces sneaker collaboration");
        let boosted = candidate("Brand Y announces exclusive sneaker collaboration");
        let ranked = engine.filter_and_rank(vec![plain.clone(), boosted.clone()]);
        assert_eq!(ranked.len(), 2);
        // The boosted headline must outrank the otherwise-identical one.
        assert_eq!(ranked[0].title, boosted.title);
        assert_eq!(ranked[1].title, plain.title);
    }

    #[test]
    fn test_brand_mentions_contribute() {
        let engine = RankingEngine::new(synthetic_config());
        let with_brand = candidate("Brand X teases a collaboration");
        let without = candidate("Someone teases a collaboration");
        let ranked = engine.filter_and_rank(vec![without.clone(), with_brand.clone()]);
        assert_eq!(ranked[0].title, with_brand.title);
    }

    #[test]
    fn test_freshness_is_fail_open_without_timestamp() {
        let engine = RankingEngine::new(synthetic_config());
        let mut dated = candidate("An exclusive capsule collaboration");
        dated.published_at = Some(Utc::now() - Duration::hours(48));
        let undated = candidate("Another big collaboration revealed");
        let ranked = engine.filter_and_rank(vec![dated, undated.clone()]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, undated.title);
    }

    #[test]
    fn test_fresh_timestamp_passes() {
        let engine = RankingEngine::new(synthetic_config());
        let mut item = candidate("An exclusive capsule collaboration");
        item.published_at = Some(Utc::now() - Duration::hours(2));
        assert_eq!(engine.filter_and_rank(vec![item]).len(), 1);
    }

    #[test]
    fn test_tie_broken_by_source_priority() {
        let engine = RankingEngine::new(synthetic_config());
        let mut low = candidate("First collaboration headline");
        low.source_priority = 1;
        let mut high = candidate("Second collaboration reveal today");
        high.source_priority = 5;
        let ranked = engine.filter_and_rank(vec![low, high.clone()]);
        assert_eq!(ranked[0].title, high.title);
    }

    #[test]
    fn test_near_duplicate_titles_collapse() {
        let engine = RankingEngine::new(synthetic_config());
        let ranked = engine.filter_and_rank(vec![
            candidate("Exclusive: the big collaboration"),
            candidate("The big collaboration"),
            candidate("A totally different collaboration story"),
        ]);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_top_m_cut() {
        let mut cfg = synthetic_config();
        cfg.max_selected = 1;
        let engine = RankingEngine::new(cfg);
        let ranked = engine.filter_and_rank(vec![
            candidate("First collaboration announcement arrives"),
            candidate("Second unrelated collaboration lands in stores"),
        ]);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let engine = RankingEngine::new(synthetic_config());
        let ranked = engine.filter_and_rank(vec![candidate("EXCLUSIVE COLLABORATION DROPS")]);
        assert_eq!(ranked.len(), 1);
    }
}
