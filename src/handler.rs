//! Gateway event glue: message intake, the ordered authorization
//! preconditions, dispatch, and the top-level error boundary.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serenity::all::{ActivityData, Context, EventHandler, Message, Ready, VoiceState};
use serenity::async_trait;

use crate::command::{self, Command, Reject};
use crate::lifecycle;
use crate::ops;
use crate::registry::RoomRegistry;

/// Shared bot state: the room registry plus the knobs from the CLI.
///
/// The registry mutex is only ever held for map access, never across an
/// await point.
pub struct BotState {
    pub registry: Mutex<RoomRegistry>,
    pub prefix: String,
    pub grace: Duration,
}

pub struct Handler {
    state: Arc<BotState>,
}

impl Handler {
    pub fn new(prefix: String, grace: Duration) -> Self {
        Self {
            state: Arc::new(BotState {
                registry: Mutex::new(RoomRegistry::new()),
                prefix,
                grace,
            }),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "Connected");
        ctx.set_activity(Some(ActivityData::watching(format!(
            "{} help",
            self.state.prefix
        ))));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(parsed) = command::parse(&msg.content, &self.state.prefix) else {
            return;
        };

        match dispatch(&ctx, &self.state, &msg, parsed).await {
            Ok(reply) => {
                if let Err(e) = ops::send(&ctx, &msg, reply).await {
                    tracing::error!(error = %e, "Failed to send reply");
                }
            }
            Err(e) => {
                // Rejections carry their own user-facing text; anything else
                // is a remote failure and gets the generic reply.
                let text = match e.downcast_ref::<Reject>() {
                    Some(reject) => reject.to_string(),
                    None => {
                        tracing::error!(author = %msg.author.id, error = %e, "Command failed");
                        "❌ Command failed!".to_string()
                    }
                };
                if let Err(e) = msg.reply(&ctx.http, text).await {
                    tracing::error!(error = %e, "Failed to send rejection reply");
                }
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        lifecycle::on_voice_update(&ctx, &self.state, old.as_ref(), &new).await;
    }
}

/// Preconditions, in order, each with its own reply: issuer in voice, that
/// channel is a tracked room, issuer owns it. They run before any
/// argument-level rejection surfaces. Ownership is skipped for `claim`,
/// whose whole point is an absent owner; `setup` runs outside any room and
/// is gated on Administrator instead.
async fn dispatch(
    ctx: &Context,
    state: &Arc<BotState>,
    msg: &Message,
    parsed: Result<Command, Reject>,
) -> anyhow::Result<ops::Reply> {
    let guild = msg.guild_id.ok_or(Reject::NotInVoice)?;

    if let Ok(Command::Setup) = parsed {
        return ops::setup(ctx, state, guild, msg).await;
    }

    let voice = lifecycle::voice_channel_of(ctx, guild, msg.author.id);
    let (voice, owner) = {
        let registry = state.registry.lock().unwrap();
        command::authorize(voice, |c| registry.owner_of(c), msg.author.id, &parsed)?
    };
    let cmd = parsed?;

    match cmd {
        Command::Rename(name) => ops::rename(ctx, voice, name).await,
        Command::Lock => ops::lock(ctx, guild, voice).await,
        Command::Unlock => ops::unlock(ctx, guild, voice).await,
        Command::Limit(n) => ops::limit(ctx, voice, n).await,
        Command::Kick(user) => ops::kick(ctx, guild, voice, user).await,
        Command::Ban(user) => ops::ban(ctx, voice, user).await,
        Command::Unban(user) => ops::unban(ctx, voice, user).await,
        Command::Permit(user) => ops::permit(ctx, voice, user).await,
        Command::Unpermit(user) => ops::unpermit(ctx, voice, user).await,
        Command::Claim => ops::claim(ctx, state, guild, voice, owner, msg.author.id).await,
        Command::Transfer(user) => ops::transfer(ctx, state, guild, voice, user).await,
        Command::Info => ops::info(ctx, state, guild, voice).await,
        Command::Help => Ok(ops::help(&state.prefix)),
        Command::Setup => unreachable!("setup is dispatched before the room preconditions"),
    }
}
