use std::time::Duration;

use anyhow::{Context, Result};
use calchecker_core::config::{CALENDAR_URL_VAR, ENCRYPTION_KEY_VAR, STATE_FILE_VAR};
use calchecker_core::fetch::{FETCH_TIMEOUT, feed_origin};
use calchecker_core::{CheckerConfig, EncryptionKey, monitor_calendar};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calchecker")]
#[command(about = "Report events added to or removed from a calendar feed since the last check")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    check: CheckArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed, print changes and save the new snapshot (default)
    Check(CheckArgs),
    /// Print a new random key for ENCRYPTION_KEY
    GenerateKey,
}

#[derive(Args)]
struct CheckArgs {
    /// Calendar feed URL (http, https or webcal)
    #[arg(long, env = CALENDAR_URL_VAR, hide_env_values = true)]
    url: Option<String>,

    /// State file encryption key (url-safe base64 of 32 bytes)
    #[arg(long, env = ENCRYPTION_KEY_VAR, hide_env_values = true)]
    key: Option<String>,

    /// Where the encrypted snapshot is kept [default: state.bin]
    #[arg(long, env = STATE_FILE_VAR)]
    state_file: Option<String>,

    /// Feed request timeout in seconds
    #[arg(
        long,
        default_value_t = FETCH_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,
}

// One HTTP request per run; no need for worker threads
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the real environment
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout only carries the report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::GenerateKey) => {
            println!("{}", EncryptionKey::generate().to_base64());
            Ok(())
        }
        Some(Commands::Check(args)) => check(args).await,
        None => check(cli.check).await,
    }
}

/// Map flags (already merged with the environment by clap) onto the config
/// variables and validate them.
fn config_from_args(args: &CheckArgs) -> Result<CheckerConfig> {
    let config = CheckerConfig::from_lookup(|name| match name {
        CALENDAR_URL_VAR => args.url.clone(),
        ENCRYPTION_KEY_VAR => args.key.clone(),
        STATE_FILE_VAR => args.state_file.clone(),
        _ => None,
    })
    .context(
        "Invalid configuration. Pass --url and --key or set CALENDAR_URL and ENCRYPTION_KEY.\n\n\
        Generate a key with:\n  \
        calchecker generate-key",
    )?;

    Ok(config.with_timeout(Duration::from_secs(args.timeout)))
}

async fn check(args: CheckArgs) -> Result<()> {
    let config = config_from_args(&args)?;
    // Feed paths often embed an access token; only the origin is shown
    let origin = feed_origin(config.calendar_url.as_str());

    info!(origin = %origin, state_file = %config.state_file.display(), "checking calendar");

    let report = monitor_calendar(&config)
        .await
        .with_context(|| format!("Failed to check calendar at {origin}"))?;

    if !report.is_empty() {
        println!("{report}");
    }

    Ok(())
}
