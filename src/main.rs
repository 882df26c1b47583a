use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use tokio::sync::watch;

use ts3_afkbot::config::Config;
use ts3_afkbot::engine::bot::AfkBot;
use ts3_afkbot::logging;
use ts3_afkbot::ts3::QueryClient;

/// Moves idle TeamSpeak 3 clients to an AFK channel.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// TOML config file. Environment variables are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    let config = Config::load_or_env(args.config.as_deref()).context("Invalid configuration")?;
    let query = QueryClient::from_config(&config);
    let mut bot = AfkBot::new(&config, query);

    if args.once {
        let report = bot.run_once().await?;
        info!(
            "Checked {} clients, moved {}, skipped {}, failed {}",
            report.seen, report.relocated, report.skipped, report.failed
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    if let Err(e) = bot.run(shutdown_rx).await {
        error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}
