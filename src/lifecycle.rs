//! Room lifecycle driven by voice-state transitions: join-to-create and
//! the empty-room reaper.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use serenity::all::{
    Channel, ChannelId, ChannelType, Context, CreateChannel, GuildId, PermissionOverwrite,
    PermissionOverwriteType, Permissions, RoleId, UserId, VoiceState,
};

use crate::handler::BotState;

/// The destination of a voice move, when it is an actual channel change.
pub fn joined_channel(old: Option<ChannelId>, new: Option<ChannelId>) -> Option<ChannelId> {
    match (old, new) {
        (old, Some(new)) if old != Some(new) => Some(new),
        _ => None,
    }
}

/// The channel a user vacated, when they actually left it.
pub fn vacated_channel(old: Option<ChannelId>, new: Option<ChannelId>) -> Option<ChannelId> {
    match (old, new) {
        (Some(old), new) if new != Some(old) => Some(old),
        _ => None,
    }
}

/// Live occupant count from the gateway cache. `None` when the guild is
/// not cached, which callers must treat as "not known to be empty".
pub fn occupants(ctx: &Context, guild: GuildId, channel: ChannelId) -> Option<usize> {
    ctx.cache.guild(guild).map(|g| {
        g.voice_states
            .values()
            .filter(|vs| vs.channel_id == Some(channel))
            .count()
    })
}

/// Deletion requires the cache to positively report an empty room. A cache
/// miss (reconnect, eviction) reads as occupied, never as empty.
pub fn confirmed_empty(occupants: Option<usize>) -> bool {
    occupants == Some(0)
}

/// The voice channel a user currently sits in, from the cache.
pub fn voice_channel_of(ctx: &Context, guild: GuildId, user: UserId) -> Option<ChannelId> {
    ctx.cache
        .guild(guild)
        .and_then(|g| g.voice_states.get(&user).and_then(|vs| vs.channel_id))
}

/// Entry point for every voice-state update: run the creation trigger for
/// joins into a creation channel, and arm the reaper for rooms left empty.
pub async fn on_voice_update(
    ctx: &Context,
    state: &Arc<BotState>,
    old: Option<&VoiceState>,
    new: &VoiceState,
) {
    let Some(guild) = new.guild_id.or_else(|| old.and_then(|vs| vs.guild_id)) else {
        return;
    };
    let old_channel = old.and_then(|vs| vs.channel_id);
    let new_channel = new.channel_id;

    if let Some(dest) = joined_channel(old_channel, new_channel) {
        let is_creation = state.registry.lock().unwrap().is_creation(dest);
        if is_creation {
            if let Err(e) = create_room(ctx, state, guild, dest, new).await {
                tracing::error!(user = %new.user_id, error = %e, "Failed to create room");
            }
        }
    }

    if let Some(vacated) = vacated_channel(old_channel, new_channel) {
        let is_room = state.registry.lock().unwrap().is_room(vacated);
        if is_room && confirmed_empty(occupants(ctx, guild, vacated)) {
            schedule_reap(ctx.clone(), state.clone(), guild, vacated);
        }
    }
}

/// Create a room for the user who just entered a creation channel, register
/// it, and pull them in. Registration happens only once creation succeeded.
async fn create_room(
    ctx: &Context,
    state: &Arc<BotState>,
    guild: GuildId,
    trigger: ChannelId,
    vs: &VoiceState,
) -> Result<()> {
    let member = match &vs.member {
        Some(m) => m.clone(),
        None => guild
            .member(&ctx.http, vs.user_id)
            .await
            .context("failed to fetch joining member")?,
    };
    let user = member.user.id;
    let name = format!("🔴 {}'s Room", member.display_name());

    // Rooms land in the creation channel's category.
    let parent = ctx
        .http
        .get_channel(trigger)
        .await
        .ok()
        .and_then(Channel::guild)
        .and_then(|c| c.parent_id);

    let overwrites = vec![
        // The owner can manage and clear out their own room.
        PermissionOverwrite {
            allow: Permissions::MANAGE_CHANNELS | Permissions::MOVE_MEMBERS,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(user),
        },
        // Explicit Connect allow: the room starts unlocked.
        PermissionOverwrite {
            allow: Permissions::CONNECT,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(RoleId::new(guild.get())),
        },
    ];

    let mut builder = CreateChannel::new(&name)
        .kind(ChannelType::Voice)
        .permissions(overwrites);
    if let Some(parent) = parent {
        builder = builder.category(parent);
    }
    let room = guild
        .create_channel(&ctx.http, builder)
        .await
        .context("channel creation failed")?;

    state.registry.lock().unwrap().register(room.id, user);
    tracing::info!(room = %room.id, owner = %user, name = %name, "Created room");

    guild
        .move_member(&ctx.http, user, room.id)
        .await
        .context("failed to move owner into their room")?;
    Ok(())
}

/// Debounced deletion: sleep out the grace period, then re-validate. A user
/// rejoining during the sleep makes the re-check a no-op, so stray timers
/// from repeated leave events are harmless.
fn schedule_reap(ctx: Context, state: Arc<BotState>, guild: GuildId, channel: ChannelId) {
    let grace = state.grace;
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;

        let Ok(fetched) = ctx.http.get_channel(channel).await else {
            // Already gone.
            return;
        };
        if fetched.guild().is_none() || !confirmed_empty(occupants(&ctx, guild, channel)) {
            return;
        }

        match channel.delete(&ctx.http).await {
            Ok(_) => {
                let record = state.registry.lock().unwrap().release(channel);
                if let Some(record) = record {
                    tracing::info!(room = %channel, owner = %record.owner, "Deleted empty room");
                }
            }
            Err(e) => {
                tracing::error!(room = %channel, error = %e, "Failed to delete empty room");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(id: u64) -> Option<ChannelId> {
        Some(ChannelId::new(id))
    }

    #[test]
    fn joining_from_nowhere_counts_as_a_join() {
        assert_eq!(joined_channel(None, ch(1)), ch(1));
    }

    #[test]
    fn switching_channels_counts_as_a_join() {
        assert_eq!(joined_channel(ch(1), ch(2)), ch(2));
    }

    #[test]
    fn staying_put_is_not_a_join() {
        assert_eq!(joined_channel(ch(1), ch(1)), None);
        assert_eq!(joined_channel(ch(1), None), None);
        assert_eq!(joined_channel(None, None), None);
    }

    #[test]
    fn disconnecting_counts_as_vacating() {
        assert_eq!(vacated_channel(ch(1), None), ch(1));
    }

    #[test]
    fn switching_channels_vacates_the_old_one() {
        assert_eq!(vacated_channel(ch(1), ch(2)), ch(1));
    }

    #[test]
    fn staying_put_vacates_nothing() {
        assert_eq!(vacated_channel(ch(1), ch(1)), None);
        assert_eq!(vacated_channel(None, ch(1)), None);
        assert_eq!(vacated_channel(None, None), None);
    }

    #[test]
    fn uncached_guild_never_reads_as_empty() {
        assert!(confirmed_empty(Some(0)));
        assert!(!confirmed_empty(Some(1)));
        assert!(!confirmed_empty(Some(3)));
        assert!(!confirmed_empty(None));
    }
}
