//! One poll-and-publish run, end to end.
//!
//! Control flow: prune the store → fetch all sources concurrently → rank
//! → walk the ranked list skipping already-published fingerprints →
//! extract → enhance → publish → commit. The commit is the last step and
//! happens only after the channel acknowledged a delivery; a failed or
//! partial publish leaves no record, so the item stays eligible for the
//! next run. Everything per-item is recovered locally — a run only
//! reports counters, it does not fail.

use crate::config::Source;
use crate::dedup::DedupStore;
use crate::enhance::Enhancer;
use crate::extract::ArticleExtractor;
use crate::models::CandidateItem;
use crate::publish::Publisher;
use crate::rank::RankingEngine;
use crate::sources::SourceReader;
use crate::telegram::Channel;
use crate::translate::Translator;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

/// How many sources are polled at once.
const FETCH_CONCURRENCY: usize = 4;

/// Counters for one completed run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunReport {
    pub discovered: usize,
    pub ranked: usize,
    pub skipped_duplicates: usize,
    pub published: usize,
    pub delivery_failures: usize,
}

pub struct Pipeline<C: Channel, T: Translator> {
    reader: SourceReader,
    ranker: RankingEngine,
    extractor: ArticleExtractor,
    enhancer: Enhancer<T>,
    publisher: Publisher<C>,
    store: DedupStore,
    sources: Vec<Source>,
    max_published: usize,
    retention: chrono::Duration,
}

impl<C: Channel, T: Translator> Pipeline<C, T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: SourceReader,
        ranker: RankingEngine,
        extractor: ArticleExtractor,
        enhancer: Enhancer<T>,
        publisher: Publisher<C>,
        store: DedupStore,
        sources: Vec<Source>,
        max_published: usize,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            reader,
            ranker,
            extractor,
            enhancer,
            publisher,
            store,
            sources,
            max_published,
            retention,
        }
    }

    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> RunReport {
        match self.store.prune(self.retention) {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Pruned expired publish records"),
            Err(e) => warn!(error = %e, "Prune failed; continuing"),
        }

        let candidates: Vec<CandidateItem> = stream::iter(self.sources.iter())
            .map(|source| self.reader.fetch(source))
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();
        info!(
            discovered = candidates.len(),
            sources = self.sources.len(),
            "Poll cycle complete"
        );

        let discovered = candidates.len();
        let ranked = self.ranker.filter_and_rank(candidates);

        let mut report = self.publish_ranked(&ranked).await;
        report.discovered = discovered;
        report.ranked = ranked.len();
        report
    }

    /// Walk the ranked candidates in order until the publish budget is
    /// spent. Split from [`run`] so the selection and commit logic can
    /// be exercised against synthetic candidates.
    async fn publish_ranked(&self, ranked: &[CandidateItem]) -> RunReport {
        let mut report = RunReport::default();

        for item in ranked {
            if report.published >= self.max_published {
                break;
            }

            let fp = item.fingerprint();
            match self.store.exists(&fp) {
                Ok(true) => {
                    debug!(title = %item.title, "Already published; skipping");
                    report.skipped_duplicates += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    // Unknown history: skip rather than risk a repost.
                    error!(error = %e, title = %item.title, "Dedup lookup failed; skipping item");
                    continue;
                }
            }

            let extracted = self.extractor.extract(&item.url).await;
            let raw_excerpt = if extracted.excerpt.is_empty() {
                debug!(title = %item.title, "No extracted text; using feed summary");
                item.summary.clone().unwrap_or_default()
            } else {
                extracted.excerpt
            };
            let excerpt = self.enhancer.enhance(&raw_excerpt).await;

            match self
                .publisher
                .publish(&item.title, &excerpt, &extracted.images)
                .await
            {
                Ok(fidelity) => {
                    // The at-most-once guarantee lives in this ordering:
                    // the record is written only after the channel
                    // acknowledged the delivery.
                    if let Err(e) = self.store.commit(&fp, &item.title) {
                        error!(
                            error = %e,
                            fingerprint = %fp,
                            "Delivered but could not record publish; next run may repost"
                        );
                    }
                    info!(
                        title = %item.title,
                        source = %item.source_name,
                        ?fidelity,
                        "Published"
                    );
                    report.published += 1;
                }
                Err(e) => {
                    error!(error = %e, title = %item.title, "All delivery fidelities failed");
                    report.delivery_failures += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractionConfig, RankingConfig, ScoreWeights};
    use crate::retry::RetryPolicy;
    use crate::telegram::DeliveryError;
    use crate::translate::{TranslationUnavailable, Translator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct NoopTranslator;

    impl Translator for NoopTranslator {
        async fn translate(
            &self,
            text: &str,
            _target_lang: &str,
        ) -> Result<String, TranslationUnavailable> {
            Ok(text.to_string())
        }
    }

    /// Channel that rejects the first `reject_first` delivery calls with
    /// a non-success status, then accepts everything.
    struct ScriptedChannel {
        reject_first: AtomicUsize,
        sends: AtomicUsize,
    }

    impl ScriptedChannel {
        fn accepting() -> Self {
            Self::rejecting_first(0)
        }

        fn rejecting_first(n: usize) -> Self {
            Self {
                reject_first: AtomicUsize::new(n),
                sends: AtomicUsize::new(0),
            }
        }

        fn outcome(&self) -> Result<(), DeliveryError> {
            let remaining = self.reject_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.reject_first.store(remaining - 1, Ordering::SeqCst);
                return Err(DeliveryError::Status {
                    code: 400,
                    body: "no".into(),
                });
            }
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Channel for ScriptedChannel {
        async fn send_media_group(
            &self,
            _caption: &str,
            _image_urls: &[String],
        ) -> Result<(), DeliveryError> {
            self.outcome()
        }

        async fn send_photo(
            &self,
            _caption: &str,
            _image_url: &str,
        ) -> Result<(), DeliveryError> {
            self.outcome()
        }

        async fn send_message(&self, _text: &str) -> Result<(), DeliveryError> {
            self.outcome()
        }
    }

    fn ranking_config() -> RankingConfig {
        RankingConfig {
            positive: vec!["collaboration".into()],
            stoplist: vec!["movie".into()],
            high_value: vec!["exclusive".into()],
            brands: vec![],
            freshness_hours: 24,
            max_selected: 3,
            weights: ScoreWeights::default(),
        }
    }

    fn candidate(n: usize) -> CandidateItem {
        CandidateItem {
            title: format!("Collaboration announcement number {n}"),
            // Unroutable host: extraction degrades fast and offline.
            url: format!("http://127.0.0.1:9/articles/{n}"),
            summary: Some(format!("Feed summary for announcement {n}.")),
            published_at: None,
            source_name: "Test".to_string(),
            source_priority: 1,
        }
    }

    fn pipeline(channel: ScriptedChannel, max_published: usize) -> Pipeline<ScriptedChannel, NoopTranslator> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        Pipeline::new(
            SourceReader::new(client.clone(), 10),
            RankingEngine::new(ranking_config()),
            ArticleExtractor::new(client, ExtractionConfig::default()),
            Enhancer::new(Some(NoopTranslator), "en".to_string(), 1000),
            Publisher::new(
                channel,
                1000,
                RetryPolicy {
                    max_attempts: 2,
                    base_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(2),
                },
            ),
            DedupStore::in_memory().unwrap(),
            Vec::new(),
            max_published,
            chrono::Duration::days(7),
        )
    }

    #[tokio::test]
    async fn test_commit_happens_only_after_success() {
        let pipeline = pipeline(ScriptedChannel::rejecting_first(usize::MAX), 1);
        let candidates: Vec<CandidateItem> = (0..3).map(candidate).collect();

        let report = pipeline.publish_ranked(&candidates).await;

        assert_eq!(report.published, 0);
        assert_eq!(report.delivery_failures, 3);
        // The core invariant: failed publishes never create records.
        assert_eq!(pipeline.store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_successful_publish_commits_exactly_once() {
        let pipeline = pipeline(ScriptedChannel::accepting(), 1);
        let candidates = vec![candidate(1), candidate(2)];

        let report = pipeline.publish_ranked(&candidates).await;

        assert_eq!(report.published, 1);
        assert_eq!(pipeline.store.len().unwrap(), 1);
        assert_eq!(pipeline.publisher.channel().sends.load(Ordering::SeqCst), 1);
        assert!(pipeline.store.exists(&candidates[0].fingerprint()).unwrap());
    }

    #[tokio::test]
    async fn test_second_run_skips_published_fingerprint() {
        let pipeline = pipeline(ScriptedChannel::accepting(), 1);
        let candidates = vec![candidate(1)];

        let first = pipeline.publish_ranked(&candidates).await;
        assert_eq!(first.published, 1);

        let second = pipeline.publish_ranked(&candidates).await;
        assert_eq!(second.published, 0);
        assert_eq!(second.skipped_duplicates, 1);

        // one record, one actual delivery across both runs
        assert_eq!(pipeline.store.len().unwrap(), 1);
        assert_eq!(pipeline.publisher.channel().sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_budget_bounds_the_run() {
        let pipeline = pipeline(ScriptedChannel::accepting(), 2);
        let candidates: Vec<CandidateItem> = (0..5).map(candidate).collect();

        let report = pipeline.publish_ranked(&candidates).await;

        assert_eq!(report.published, 2);
        assert_eq!(pipeline.store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delivery_failure_moves_to_next_candidate() {
        // Candidates here carry no images, so each publish is a single
        // text-rung call; reject the first candidate's call only.
        let pipeline = pipeline(ScriptedChannel::rejecting_first(1), 1);
        let candidates = vec![candidate(1), candidate(2)];

        let report = pipeline.publish_ranked(&candidates).await;

        assert_eq!(report.delivery_failures, 1);
        assert_eq!(report.published, 1);
        // The failed item stays eligible for the next run.
        assert!(!pipeline.store.exists(&candidates[0].fingerprint()).unwrap());
        assert!(pipeline.store.exists(&candidates[1].fingerprint()).unwrap());
    }
}
