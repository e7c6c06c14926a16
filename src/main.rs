//! roomkeeper: temporary voice rooms for Discord.
//!
//! Join the creation channel and the bot creates a voice room for you,
//! moves you in, and gives you owner commands:
//!
//!   .v name <name>          — rename the room
//!   .v lock / unlock        — close or reopen the room
//!   .v limit <1-99>         — cap the member count
//!   .v kick @user           — disconnect someone
//!   .v ban / unban @user    — keep someone out
//!   .v permit / unpermit @user — lock bypass for one user
//!   .v claim                — take over an abandoned room
//!   .v transfer @user       — hand the room over
//!   .v info / help
//!   .v setup                — admin: create the creation channel
//!
//! Requires DISCORD_TOKEN environment variable.

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use serenity::all::{Client, GatewayIntents};

use roomkeeper::handler::Handler;

#[derive(Parser)]
#[command(name = "roomkeeper", about = "Temporary voice room bot for Discord")]
struct Args {
    /// Bot token (or set DISCORD_TOKEN env var)
    #[arg(long, env = "DISCORD_TOKEN")]
    token: String,

    /// Command prefix
    #[arg(long, default_value = ".v")]
    prefix: String,

    /// Seconds an empty room lingers before deletion
    #[arg(long, default_value_t = 10)]
    grace_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomkeeper=info".into()),
        )
        .init();

    let args = Args::parse();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    tracing::info!(prefix = %args.prefix, grace_secs = args.grace_secs, "Starting roomkeeper");

    let mut client = Client::builder(&args.token, intents)
        .event_handler(Handler::new(
            args.prefix,
            Duration::from_secs(args.grace_secs),
        ))
        .await
        .context("Failed to build gateway client")?;

    client.start().await.context("Gateway connection failed")?;
    Ok(())
}
