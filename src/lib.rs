//! roomkeeper: temporary voice rooms for Discord.
//!
//! A user joins the designated creation channel, the bot spins up a fresh
//! voice channel for them, moves them in, and gives them owner commands
//! (rename, lock, limit, kick, ban, permit, claim, transfer). Rooms are
//! deleted once they sit empty for a grace period.

pub mod command;
pub mod handler;
pub mod lifecycle;
pub mod ops;
pub mod registry;
