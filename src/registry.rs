//! In-memory room ownership registry.
//!
//! One map carries both the temp-channel set and the owner record (a room
//! always has exactly one current owner, so the two stay in lockstep by
//! construction), plus the set of join-to-create trigger channels. Nothing
//! here is persisted; the registry starts empty on every boot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, UserId};

/// A tracked temporary voice channel.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

/// Tracker for temporary rooms and their creation triggers.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<ChannelId, RoomRecord>,
    creation: HashSet<ChannelId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly created room. Refuses creation channels so the two
    /// id sets stay disjoint.
    pub fn register(&mut self, channel: ChannelId, owner: UserId) -> bool {
        if self.creation.contains(&channel) {
            return false;
        }
        self.rooms.insert(
            channel,
            RoomRecord {
                owner,
                created_at: Utc::now(),
            },
        );
        true
    }

    /// Forget a room. Returns its record if it was tracked.
    pub fn release(&mut self, channel: ChannelId) -> Option<RoomRecord> {
        self.rooms.remove(&channel)
    }

    pub fn room(&self, channel: ChannelId) -> Option<&RoomRecord> {
        self.rooms.get(&channel)
    }

    pub fn is_room(&self, channel: ChannelId) -> bool {
        self.rooms.contains_key(&channel)
    }

    pub fn owner_of(&self, channel: ChannelId) -> Option<UserId> {
        self.rooms.get(&channel).map(|r| r.owner)
    }

    /// Reassign ownership (claim / transfer). No-op on untracked channels.
    pub fn set_owner(&mut self, channel: ChannelId, owner: UserId) -> bool {
        match self.rooms.get_mut(&channel) {
            Some(record) => {
                record.owner = owner;
                true
            }
            None => false,
        }
    }

    /// Mark a channel as a join-to-create trigger. Refuses tracked rooms.
    pub fn add_creation(&mut self, channel: ChannelId) -> bool {
        if self.rooms.contains_key(&channel) {
            return false;
        }
        self.creation.insert(channel)
    }

    pub fn is_creation(&self, channel: ChannelId) -> bool {
        self.creation.contains(&channel)
    }
}
