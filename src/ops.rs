//! One executor per room command.
//!
//! Each returns the reply to send. Precondition problems surface as
//! `Reject` (downcast at the dispatch boundary into their own reply);
//! anything else is a remote-operation failure.

use anyhow::{Context as _, Result};
use serenity::all::{
    Channel, ChannelId, ChannelType, Context, CreateChannel, CreateEmbed, CreateEmbedFooter,
    CreateMessage, EditChannel, EditMember, GuildChannel, GuildId, Member, Message,
    PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};

use crate::command::Reject;
use crate::handler::BotState;
use crate::lifecycle;

const EMBED_COLOR: u32 = 0xFF0000;

/// Outcome of a successful command: either a plain reply or an embed.
pub enum Reply {
    Text(String),
    Embed(CreateEmbed),
}

/// Send a reply back to the issuing message.
pub async fn send(ctx: &Context, msg: &Message, reply: Reply) -> Result<()> {
    match reply {
        Reply::Text(text) => {
            msg.reply(&ctx.http, text).await?;
        }
        Reply::Embed(embed) => {
            let builder = CreateMessage::new().embed(embed).reference_message(msg);
            msg.channel_id.send_message(&ctx.http, builder).await?;
        }
    }
    Ok(())
}

pub async fn rename(ctx: &Context, channel: ChannelId, name: String) -> Result<Reply> {
    channel
        .edit(&ctx.http, EditChannel::new().name(&name))
        .await
        .context("rename failed")?;
    Ok(Reply::Text(format!("✅ Renamed the room to: **{name}**")))
}

pub async fn lock(ctx: &Context, guild: GuildId, channel: ChannelId) -> Result<Reply> {
    deny_connect(ctx, channel, PermissionOverwriteType::Role(everyone(guild))).await?;
    Ok(Reply::Text("🔒 Room locked!".into()))
}

pub async fn unlock(ctx: &Context, guild: GuildId, channel: ChannelId) -> Result<Reply> {
    clear_connect(ctx, channel, PermissionOverwriteType::Role(everyone(guild))).await?;
    Ok(Reply::Text("🔓 Room unlocked!".into()))
}

pub async fn limit(ctx: &Context, channel: ChannelId, limit: u16) -> Result<Reply> {
    channel
        .edit(&ctx.http, EditChannel::new().user_limit(u32::from(limit)))
        .await
        .context("setting user limit failed")?;
    Ok(Reply::Text(format!("✅ User limit set to: **{limit}**")))
}

pub async fn kick(
    ctx: &Context,
    guild: GuildId,
    channel: ChannelId,
    target: UserId,
) -> Result<Reply> {
    let member = fetch_member(ctx, guild, target).await?;
    if lifecycle::voice_channel_of(ctx, guild, target) != Some(channel) {
        return Err(Reject::NotInRoom.into());
    }
    guild
        .edit_member(&ctx.http, target, EditMember::new().disconnect_member())
        .await
        .context("disconnect failed")?;
    Ok(Reply::Text(format!("✅ Kicked **{}**!", member.user.tag())))
}

pub async fn ban(ctx: &Context, channel: ChannelId, target: UserId) -> Result<Reply> {
    deny_connect(ctx, channel, PermissionOverwriteType::Member(target)).await?;
    Ok(Reply::Text(format!("✅ Banned <@{target}> from the room!")))
}

pub async fn unban(ctx: &Context, channel: ChannelId, target: UserId) -> Result<Reply> {
    clear_connect(ctx, channel, PermissionOverwriteType::Member(target)).await?;
    Ok(Reply::Text(format!("✅ Unbanned <@{target}>!")))
}

pub async fn permit(ctx: &Context, channel: ChannelId, target: UserId) -> Result<Reply> {
    allow_connect(ctx, channel, PermissionOverwriteType::Member(target)).await?;
    Ok(Reply::Text(format!(
        "✅ <@{target}> may now join even when the room is locked!"
    )))
}

pub async fn unpermit(ctx: &Context, channel: ChannelId, target: UserId) -> Result<Reply> {
    clear_connect(ctx, channel, PermissionOverwriteType::Member(target)).await?;
    Ok(Reply::Text(format!(
        "✅ <@{target}> no longer has special access!"
    )))
}

/// Take over a room whose recorded owner is gone. Refused while the owner
/// can still be resolved as sitting in this room.
pub async fn claim(
    ctx: &Context,
    state: &BotState,
    guild: GuildId,
    channel: ChannelId,
    owner: UserId,
    claimant: UserId,
) -> Result<Reply> {
    let owner_present = guild.member(&ctx.http, owner).await.is_ok()
        && lifecycle::voice_channel_of(ctx, guild, owner) == Some(channel);
    if owner_present {
        return Err(Reject::OwnerPresent.into());
    }
    state.registry.lock().unwrap().set_owner(channel, claimant);
    tracing::info!(room = %channel, from = %owner, to = %claimant, "Room claimed");
    Ok(Reply::Text("✅ You now own this room!".into()))
}

/// Hand the room to another member, unconditionally.
pub async fn transfer(
    ctx: &Context,
    state: &BotState,
    guild: GuildId,
    channel: ChannelId,
    target: UserId,
) -> Result<Reply> {
    let member = fetch_member(ctx, guild, target).await?;
    state.registry.lock().unwrap().set_owner(channel, target);
    tracing::info!(room = %channel, to = %target, "Room transferred");
    Ok(Reply::Text(format!(
        "✅ Transferred the room to **{}**!",
        member.user.tag()
    )))
}

pub async fn info(
    ctx: &Context,
    state: &BotState,
    guild: GuildId,
    channel: ChannelId,
) -> Result<Reply> {
    let record = state
        .registry
        .lock()
        .unwrap()
        .room(channel)
        .cloned()
        .ok_or(Reject::NotARoom)?;

    let live = fetch_guild_channel(ctx, channel).await?;
    let owner_tag = match guild.member(&ctx.http, record.owner).await {
        Ok(m) => m.user.tag(),
        Err(_) => "Unknown".to_string(),
    };
    let occupancy = match lifecycle::occupants(ctx, guild, channel) {
        Some(n) => n.to_string(),
        None => "?".to_string(),
    };
    let limit = match live.user_limit {
        Some(n) if n > 0 => n.to_string(),
        _ => "Unlimited".to_string(),
    };
    let locked = live.permission_overwrites.iter().any(|po| {
        po.kind == PermissionOverwriteType::Role(everyone(guild))
            && po.deny.contains(Permissions::CONNECT)
    });

    let embed = CreateEmbed::new()
        .title(format!("🔴 {}", live.name))
        .colour(EMBED_COLOR)
        .field("👑 Owner", owner_tag, true)
        .field("👥 Members", format!("{occupancy}/{limit}"), true)
        .field("🔒 Status", if locked { "Locked" } else { "Unlocked" }, true)
        .field(
            "🕒 Created",
            record.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            true,
        )
        .footer(CreateEmbedFooter::new("roomkeeper"));
    Ok(Reply::Embed(embed))
}

pub fn help(prefix: &str) -> Reply {
    let description = format!(
        "**Channel management:**\n\
         `{prefix} name <name>` — rename the room\n\
         `{prefix} lock` / `{prefix} unlock` — close or reopen the room\n\
         `{prefix} limit <1-99>` — cap the member count\n\n\
         **User management:**\n\
         `{prefix} kick @user` — disconnect someone\n\
         `{prefix} ban @user` / `{prefix} unban @user` — keep someone out\n\
         `{prefix} permit @user` / `{prefix} unpermit @user` — lock bypass\n\n\
         **Ownership:**\n\
         `{prefix} claim` — take over an abandoned room\n\
         `{prefix} transfer @user` — hand the room over\n\
         `{prefix} info` — room details"
    );
    Reply::Embed(
        CreateEmbed::new()
            .title("🔴 roomkeeper commands")
            .colour(EMBED_COLOR)
            .description(description)
            .footer(CreateEmbedFooter::new(
                "Join the creation channel to get started!",
            )),
    )
}

/// Admin-only: create the join-to-create channel and start watching it.
pub async fn setup(
    ctx: &Context,
    state: &BotState,
    guild: GuildId,
    msg: &Message,
) -> Result<Reply> {
    let member = msg.member(&ctx.http).await.context("failed to fetch issuer")?;
    if !is_admin(ctx, guild, &member) {
        return Err(Reject::NeedAdmin.into());
    }

    // Next to the text channel the command came from, if it has a category.
    let parent = ctx
        .http
        .get_channel(msg.channel_id)
        .await
        .ok()
        .and_then(Channel::guild)
        .and_then(|c| c.parent_id);

    let mut builder = CreateChannel::new("🔴 Create Room").kind(ChannelType::Voice);
    if let Some(parent) = parent {
        builder = builder.category(parent);
    }
    let channel = guild
        .create_channel(&ctx.http, builder)
        .await
        .context("creation channel setup failed")?;

    state.registry.lock().unwrap().add_creation(channel.id);
    tracing::info!(channel = %channel.id, guild = %guild, "Registered creation channel");
    Ok(Reply::Text(
        "✅ Setup complete! Join the creation channel to get your own room.".into(),
    ))
}

fn everyone(guild: GuildId) -> RoleId {
    RoleId::new(guild.get())
}

fn is_admin(ctx: &Context, guild: GuildId, member: &Member) -> bool {
    ctx.cache
        .guild(guild)
        .map(|g| {
            g.owner_id == member.user.id
                || member.roles.iter().any(|role| {
                    g.roles
                        .get(role)
                        .map(|r| r.permissions.administrator())
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}

/// Lookup-misses are precondition rejections, not errors.
async fn fetch_member(ctx: &Context, guild: GuildId, user: UserId) -> Result<Member> {
    guild
        .member(&ctx.http, user)
        .await
        .map_err(|_| Reject::NoSuchMember.into())
}

async fn fetch_guild_channel(ctx: &Context, channel: ChannelId) -> Result<GuildChannel> {
    ctx.http
        .get_channel(channel)
        .await
        .context("channel fetch failed")?
        .guild()
        .context("not a guild channel")
}

async fn deny_connect(
    ctx: &Context,
    channel: ChannelId,
    kind: PermissionOverwriteType,
) -> Result<()> {
    channel
        .create_permission(
            &ctx.http,
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::CONNECT,
                kind,
            },
        )
        .await
        .context("permission edit failed")
}

async fn allow_connect(
    ctx: &Context,
    channel: ChannelId,
    kind: PermissionOverwriteType,
) -> Result<()> {
    channel
        .create_permission(
            &ctx.http,
            PermissionOverwrite {
                allow: Permissions::CONNECT,
                deny: Permissions::empty(),
                kind,
            },
        )
        .await
        .context("permission edit failed")
}

/// Resets the target back to the channel's inherited behavior.
async fn clear_connect(
    ctx: &Context,
    channel: ChannelId,
    kind: PermissionOverwriteType,
) -> Result<()> {
    channel
        .delete_permission(&ctx.http, kind)
        .await
        .context("permission reset failed")
}
