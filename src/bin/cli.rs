//! sunup CLI
//!
//! Local execution entry point for assembling and mailing the daily digest.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sunup::mail::{TokenCacheStatus, inspect_credentials};
use sunup::{error::Result, models::Config, pipeline};

/// sunup - Daily Digest Mailer
#[derive(Parser, Debug)]
#[command(
    name = "sunup",
    version,
    about = "Assembles and mails a personalized morning digest"
)]

struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch everything, then render and send one email per recipient
    Run {
        /// Fetch and render but do not authenticate or send
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch everything and print the assembled digest as JSON
    Fetch,

    /// Validate the configuration file and the Gmail credential setup
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    log::info!("sunup starting...");

    let config = Config::load(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    let config = Arc::new(config);

    match cli.command {
        Command::Run { dry_run } => {
            config.validate()?;

            let summary = pipeline::run(Arc::clone(&config), dry_run).await?;
            if dry_run {
                log::info!("Dry run complete: {} digests rendered.", summary.skipped);
            }
        }

        Command::Fetch => {
            config.validate()?;

            let ctx = pipeline::fetch_digest(Arc::clone(&config)).await?;
            println!("{}", serde_json::to_string_pretty(&ctx)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} recipients, '{}' format)",
                config.email.recipients.len(),
                config.email.format
            );

            let status = inspect_credentials(&config.auth).await?;
            log::info!(
                "✓ Credentials OK ({})",
                config.auth.credentials_path.display()
            );
            match status {
                TokenCacheStatus::Refreshable => log::info!("✓ Token cache OK (refreshable)"),
                TokenCacheStatus::AccessOnly => log::warn!(
                    "Token cache has no refresh token; expect a consent prompt once it goes stale."
                ),
                TokenCacheStatus::Missing => log::warn!(
                    "No token cache at {}; the first run will open a consent prompt.",
                    config.auth.token_path.display()
                ),
            }

            match std::env::var(pipeline::PLACES_API_KEY_VAR) {
                Ok(key) if !key.is_empty() => {
                    log::info!("✓ {} is set", pipeline::PLACES_API_KEY_VAR);
                }
                _ => log::warn!(
                    "{} is not set; digests will go out without the places section.",
                    pipeline::PLACES_API_KEY_VAR
                ),
            }

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
