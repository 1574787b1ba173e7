//! Command-line interface definitions.
//!
//! All options can be provided via flags or environment variables. The
//! channel credentials are required: a missing token or channel aborts
//! the run before any network activity, which is the only non-zero exit
//! this binary produces.

use clap::Parser;

/// Command-line arguments for one pipeline run.
///
/// # Examples
///
/// ```sh
/// # Built-in defaults, credentials from the environment
/// BOT_TOKEN=... CHANNEL=@fashion runway_wire
///
/// # Explicit config and database locations
/// runway_wire -c ./runway.yaml -d /var/lib/runway_wire/published.redb
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to the publish-history database
    #[arg(short, long, default_value = "runway_wire.redb")]
    pub db_path: String,

    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Target channel: @name or numeric chat id
    #[arg(long, env = "CHANNEL")]
    pub channel: String,
}
