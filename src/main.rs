//! Life Giver CLI entry point.

use lifegiver::Config;
use lifegiver::bot::Handler;

use anyhow::Context as _;
use clap::Parser;
use serenity::all::{Client, GatewayIntents};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lifegiver", version, about = "Discord voice timer and support ticket assistant")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "LIFEGIVER_CONFIG", default_value = "lifegiver.toml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    lifegiver::logging::init_tracing(cli.debug);

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if config.discord.token.trim().is_empty() {
        anyhow::bail!("discord.token is not set in {}", cli.config.display());
    }

    let handler = Arc::new(Handler::new(Arc::new(config.clone())));
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;
    let mut client = Client::builder(&config.discord.token, intents)
        .event_handler_arc(handler.clone())
        .await
        .context("failed to build discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("shutdown signal received");
        shard_manager.shutdown_all().await;
    });

    tracing::info!(config = %cli.config.display(), "starting lifegiver");
    let result = client.start().await.context("discord client stopped with an error");
    handler.shutdown();
    result
}
