//! # Runway Wire
//!
//! A scheduled fashion-news pipeline: poll feed and listing sources,
//! rank candidates by relevance, deduplicate against publish history,
//! extract an excerpt and up to three quality images, optionally
//! translate the excerpt, and deliver one item per run to a Telegram
//! channel.
//!
//! ## Usage
//!
//! ```sh
//! BOT_TOKEN=123:abc CHANNEL=@fashion runway_wire -c runway.yaml
//! ```
//!
//! Meant to run from cron (every 30 minutes works well); each invocation
//! is one batch run. The process exits 0 on any completed run — finding
//! nothing new to publish is not an error — and non-zero only on
//! configuration failures detected before the first network call.
//!
//! ## Architecture
//!
//! 1. **Poll**: read candidate items from every configured source (4 at a time)
//! 2. **Rank**: two-sided keyword gate, freshness horizon, weighted score
//! 3. **Select**: skip fingerprints already in the publish history
//! 4. **Extract**: excerpt + image ladder from the article page
//! 5. **Enhance**: boilerplate scrub, best-effort translation, caption budget
//! 6. **Publish**: media group → single photo → text-only, committing
//!    the history record only after an acknowledged delivery

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod dedup;
mod enhance;
mod extract;
mod models;
mod pipeline;
mod publish;
mod rank;
mod retry;
mod sources;
mod telegram;
mod translate;
mod utils;

use cli::Cli;
use config::AppConfig;
use dedup::DedupStore;
use enhance::Enhancer;
use extract::ArticleExtractor;
use pipeline::Pipeline;
use publish::Publisher;
use rank::RankingEngine;
use retry::RetryPolicy;
use sources::SourceReader;
use telegram::TelegramChannel;
use translate::HttpTranslator;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("runway_wire starting up");

    // Parse CLI; clap already enforces the channel credentials.
    let args = Cli::parse();
    debug!(?args.config, ?args.db_path, channel = %args.channel, "Parsed CLI arguments");

    // --- Configuration (fatal on error, before any network call) ---
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => {
            info!("No config file given; using built-in defaults");
            AppConfig::default()
        }
    };
    config.validate()?;

    // --- Publish history ---
    let store = DedupStore::open(Path::new(&args.db_path))?;
    debug!(db_path = %args.db_path, "Opened publish history");

    // --- Components ---
    let client = utils::browser_client(config.publishing.request_timeout_secs)?;
    let reader = SourceReader::new(client.clone(), config.publishing.max_items_per_source);
    let extractor = ArticleExtractor::new(client.clone(), config.extraction);
    let ranker = RankingEngine::new(config.ranking.clone());

    let translator = match &config.translation {
        Some(tc) => {
            info!(endpoint = %tc.endpoint, target_lang = %tc.target_lang, "Translation enabled");
            Some(HttpTranslator::new(tc, config.publishing.request_timeout_secs)?)
        }
        None => None,
    };
    let target_lang = config
        .translation
        .as_ref()
        .map(|tc| tc.target_lang.clone())
        .unwrap_or_default();
    let enhancer = Enhancer::new(translator, target_lang, config.publishing.caption_limit);

    let retry = RetryPolicy::new(
        config.publishing.retry_max_attempts,
        Duration::from_millis(config.publishing.retry_base_delay_ms),
    );
    let channel = TelegramChannel::new(client, &args.bot_token, &args.channel);
    let publisher = Publisher::new(channel, config.publishing.caption_limit, retry);

    let pipeline = Pipeline::new(
        reader,
        ranker,
        extractor,
        enhancer,
        publisher,
        store,
        config.sources.clone(),
        config.publishing.max_published_per_run,
        chrono::Duration::days(config.retention_days),
    );

    // --- Run ---
    let report = pipeline.run().await;

    let elapsed = start_time.elapsed();
    info!(
        discovered = report.discovered,
        ranked = report.ranked,
        skipped_duplicates = report.skipped_duplicates,
        published = report.published,
        delivery_failures = report.delivery_failures,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Run complete"
    );

    // Per-item delivery failures are retried naturally on the next
    // scheduled run; they do not fail the process.
    Ok(())
}
