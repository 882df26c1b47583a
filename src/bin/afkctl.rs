use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ts3_afkbot::config::Config;
use ts3_afkbot::engine::filter::Filter;
use ts3_afkbot::engine::report;
use ts3_afkbot::logging;
use ts3_afkbot::ts3::{QueryClient, ServerQuery};

/// Inspect channels and idle users on the TeamSpeak 3 server.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// TOML config file. Environment variables are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List channels on the server.
    Channels,
    /// List users in the filtered channels along with their idle time.
    IdleUsers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    let config = Config::load_or_env(args.config.as_deref()).context("Invalid configuration")?;
    let mut query = QueryClient::from_config(&config);

    query.connect().await.context("Failed to connect")?;
    let result = match query.select_server(config.server.virtual_server_id).await {
        Ok(()) => match args.command {
            Command::Channels => print_channels(&mut query).await,
            Command::IdleUsers => print_idle_users(&mut query, &Filter::from_config(&config.afk)).await,
        },
        Err(e) => Err(e).context("Failed to select virtual server"),
    };
    query.disconnect().await;

    result
}

async fn print_channels(query: &mut QueryClient) -> Result<()> {
    let channels = report::list_channels(query).await?;
    if channels.is_empty() {
        println!("No channels found on the server.");
        return Ok(());
    }

    println!("List of Channels:");
    for channel in channels {
        println!("- {} (ID: {})", channel.name, channel.cid);
    }
    Ok(())
}

async fn print_idle_users(query: &mut QueryClient, filter: &Filter) -> Result<()> {
    let (clients, groups) = report::idle_users(query, filter).await?;
    if clients.is_empty() {
        println!("No clients found on the server.");
        return Ok(());
    }

    for group in groups {
        let channel = &group.channel;
        if group.clients.is_empty() {
            println!("No users found in channel {} (ID: {}).", channel.name, channel.cid);
            continue;
        }

        println!("Users in channel {} (ID: {}):", channel.name, channel.cid);
        for client in &group.clients {
            println!(
                "- {} (ID: {}) - Idle time: {}",
                client.nickname,
                client.clid,
                report::format_idle(client.idle_ms)
            );
        }
    }
    Ok(())
}
