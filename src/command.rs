//! Command grammar for the room prefix.
//!
//! A closed set of subcommands; adding one is a compile-checked change to
//! the enum plus its executor. Argument validation happens here so the
//! dispatch layer only ever sees well-formed commands.

use serenity::all::{ChannelId, UserId};
use thiserror::Error;

/// Maximum channel name length Discord accepts.
pub const MAX_NAME_LEN: usize = 100;

/// Inclusive user-limit range Discord accepts for voice channels.
pub const LIMIT_RANGE: std::ops::RangeInclusive<u16> = 1..=99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Rename(String),
    Lock,
    Unlock,
    Limit(u16),
    Kick(UserId),
    Ban(UserId),
    Unban(UserId),
    Permit(UserId),
    Unpermit(UserId),
    Claim,
    Transfer(UserId),
    Info,
    Help,
    Setup,
}

/// Precondition rejections. `Display` is the exact user-facing reply, so
/// the dispatch boundary forwards these verbatim instead of logging them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Reject {
    #[error("❌ You must be in a voice channel to use room commands!")]
    NotInVoice,
    #[error("❌ You can only manage rooms created by the bot!")]
    NotARoom,
    #[error("❌ Only the room owner can do that!")]
    NotOwner,
    #[error("❌ The owner is still in the room!")]
    OwnerPresent,
    #[error("❌ Please provide a new name!")]
    MissingName,
    #[error("❌ Names are limited to 100 characters!")]
    NameTooLong,
    #[error("❌ Please provide a valid limit 1-99!")]
    BadLimit,
    #[error("❌ Please mention a user!")]
    MissingMention,
    #[error("❌ That doesn't look like a user mention!")]
    BadMention,
    #[error("❌ User not found in your room!")]
    NotInRoom,
    #[error("❌ No such member on this server!")]
    NoSuchMember,
    #[error("❌ Only administrators can run setup!")]
    NeedAdmin,
    #[error("❌ Unknown command! Try `{0} help`")]
    Unknown(String),
}

/// Parse a message body. `None` when the message doesn't carry the prefix
/// at all; `Some(Err)` when it does but the command or its arguments are
/// bad.
pub fn parse(content: &str, prefix: &str) -> Option<Result<Command, Reject>> {
    let rest = content.strip_prefix(prefix)?.strip_prefix(' ')?;
    let mut words = rest.split_whitespace();
    let cmd = words.next()?.to_lowercase();
    let args: Vec<&str> = words.collect();

    Some(match cmd.as_str() {
        "name" | "rename" => parse_rename(&args),
        "lock" => Ok(Command::Lock),
        "unlock" => Ok(Command::Unlock),
        "limit" => parse_limit(&args),
        "kick" => mention_arg(&args).map(Command::Kick),
        "ban" => mention_arg(&args).map(Command::Ban),
        "unban" => mention_arg(&args).map(Command::Unban),
        "permit" => mention_arg(&args).map(Command::Permit),
        "unpermit" => mention_arg(&args).map(Command::Unpermit),
        "claim" => Ok(Command::Claim),
        "transfer" => mention_arg(&args).map(Command::Transfer),
        "info" => Ok(Command::Info),
        "help" => Ok(Command::Help),
        "setup" => Ok(Command::Setup),
        _ => Err(Reject::Unknown(prefix.to_string())),
    })
}

fn parse_rename(args: &[&str]) -> Result<Command, Reject> {
    let name = args.join(" ");
    if name.is_empty() {
        return Err(Reject::MissingName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Reject::NameTooLong);
    }
    Ok(Command::Rename(name))
}

fn parse_limit(args: &[&str]) -> Result<Command, Reject> {
    let limit: u16 = args
        .first()
        .and_then(|s| s.parse().ok())
        .ok_or(Reject::BadLimit)?;
    if !LIMIT_RANGE.contains(&limit) {
        return Err(Reject::BadLimit);
    }
    Ok(Command::Limit(limit))
}

fn mention_arg(args: &[&str]) -> Result<UserId, Reject> {
    match args.first() {
        Some(raw) => parse_mention(raw).ok_or(Reject::BadMention),
        None => Err(Reject::MissingMention),
    }
}

/// The ordered precondition checks: issuer in voice, that channel is a
/// tracked room, issuer is its recorded owner. These outrank argument
/// rejections — a user outside a room hears about the room first, however
/// malformed the command — so the still-unvalidated parse result is only
/// consulted for the `claim` ownership exemption.
pub fn authorize(
    voice: Option<ChannelId>,
    owner_of: impl FnOnce(ChannelId) -> Option<UserId>,
    issuer: UserId,
    parsed: &Result<Command, Reject>,
) -> Result<(ChannelId, UserId), Reject> {
    let channel = voice.ok_or(Reject::NotInVoice)?;
    let owner = owner_of(channel).ok_or(Reject::NotARoom)?;
    if owner != issuer && !matches!(parsed, Ok(Command::Claim)) {
        return Err(Reject::NotOwner);
    }
    Ok((channel, owner))
}

/// Accepts `<@123>`, `<@!123>`, or a bare numeric id.
pub fn parse_mention(raw: &str) -> Option<UserId> {
    let digits = raw
        .strip_prefix("<@")
        .and_then(|s| s.trim_start_matches('!').strip_suffix('>'))
        .unwrap_or(raw);
    let id: u64 = digits.parse().ok()?;
    (id != 0).then(|| UserId::new(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_v(content: &str) -> Option<Result<Command, Reject>> {
        parse(content, ".v")
    }

    #[test]
    fn ignores_unprefixed_messages() {
        assert_eq!(parse_v("hello world"), None);
        assert_eq!(parse_v("v lock"), None);
    }

    #[test]
    fn requires_a_space_after_the_prefix() {
        assert_eq!(parse_v(".vlock"), None);
        assert_eq!(parse_v(".v"), None);
        assert_eq!(parse_v(".v "), None);
    }

    #[test]
    fn rename_joins_the_remaining_words() {
        assert_eq!(
            parse_v(".v name My Cool Room"),
            Some(Ok(Command::Rename("My Cool Room".into())))
        );
        assert_eq!(
            parse_v(".v rename foo"),
            Some(Ok(Command::Rename("foo".into())))
        );
    }

    #[test]
    fn rename_validates_name_length() {
        assert_eq!(parse_v(".v name"), Some(Err(Reject::MissingName)));

        let max = "x".repeat(MAX_NAME_LEN);
        assert_eq!(
            parse_v(&format!(".v name {max}")),
            Some(Ok(Command::Rename(max.clone())))
        );
        assert_eq!(
            parse_v(&format!(".v name {max}y")),
            Some(Err(Reject::NameTooLong))
        );
    }

    #[test]
    fn limit_accepts_only_one_through_ninety_nine() {
        assert_eq!(parse_v(".v limit 1"), Some(Ok(Command::Limit(1))));
        assert_eq!(parse_v(".v limit 99"), Some(Ok(Command::Limit(99))));
        assert_eq!(parse_v(".v limit 0"), Some(Err(Reject::BadLimit)));
        assert_eq!(parse_v(".v limit 100"), Some(Err(Reject::BadLimit)));
        assert_eq!(parse_v(".v limit lots"), Some(Err(Reject::BadLimit)));
        assert_eq!(parse_v(".v limit"), Some(Err(Reject::BadLimit)));
    }

    #[test]
    fn mention_forms_all_resolve() {
        let expected = Some(Ok(Command::Kick(UserId::new(123))));
        assert_eq!(parse_v(".v kick <@123>"), expected);
        assert_eq!(parse_v(".v kick <@!123>"), expected);
        assert_eq!(parse_v(".v kick 123"), expected);
    }

    #[test]
    fn bad_mentions_are_rejected() {
        assert_eq!(parse_v(".v ban"), Some(Err(Reject::MissingMention)));
        assert_eq!(parse_v(".v ban <@abc>"), Some(Err(Reject::BadMention)));
        assert_eq!(parse_v(".v ban 0"), Some(Err(Reject::BadMention)));
        assert_eq!(parse_v(".v ban @someone"), Some(Err(Reject::BadMention)));
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse_v(".v LOCK"), Some(Ok(Command::Lock)));
        assert_eq!(parse_v(".v Claim"), Some(Ok(Command::Claim)));
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(parse_v(".v lock"), Some(Ok(Command::Lock)));
        assert_eq!(parse_v(".v unlock"), Some(Ok(Command::Unlock)));
        assert_eq!(parse_v(".v claim"), Some(Ok(Command::Claim)));
        assert_eq!(parse_v(".v info"), Some(Ok(Command::Info)));
        assert_eq!(parse_v(".v help"), Some(Ok(Command::Help)));
        assert_eq!(parse_v(".v setup"), Some(Ok(Command::Setup)));
    }

    #[test]
    fn unknown_commands_get_a_usage_hint() {
        assert_eq!(
            parse_v(".v dance"),
            Some(Err(Reject::Unknown(".v".into())))
        );
    }

    #[test]
    fn precondition_rejections_outrank_argument_errors() {
        let bad_limit = Err(Reject::BadLimit);
        assert_eq!(
            authorize(None, |_| None, UserId::new(1), &bad_limit),
            Err(Reject::NotInVoice)
        );
        assert_eq!(
            authorize(Some(ChannelId::new(5)), |_| None, UserId::new(1), &bad_limit),
            Err(Reject::NotARoom)
        );
        assert_eq!(
            authorize(
                Some(ChannelId::new(5)),
                |_| Some(UserId::new(2)),
                UserId::new(1),
                &bad_limit
            ),
            Err(Reject::NotOwner)
        );
    }

    #[test]
    fn owner_in_their_room_sees_argument_errors() {
        let out = authorize(
            Some(ChannelId::new(5)),
            |_| Some(UserId::new(1)),
            UserId::new(1),
            &Err(Reject::BadMention),
        );
        assert_eq!(out, Ok((ChannelId::new(5), UserId::new(1))));
    }

    #[test]
    fn claim_skips_the_ownership_check_only() {
        let owner_of = |_| Some(UserId::new(2));
        assert_eq!(
            authorize(Some(ChannelId::new(5)), owner_of, UserId::new(1), &Ok(Command::Claim)),
            Ok((ChannelId::new(5), UserId::new(2)))
        );
        assert_eq!(
            authorize(Some(ChannelId::new(5)), owner_of, UserId::new(1), &Ok(Command::Lock)),
            Err(Reject::NotOwner)
        );
        assert_eq!(
            authorize(None, owner_of, UserId::new(1), &Ok(Command::Claim)),
            Err(Reject::NotInVoice)
        );
    }

    #[test]
    fn transfer_and_permit_take_mentions() {
        assert_eq!(
            parse_v(".v transfer <@42>"),
            Some(Ok(Command::Transfer(UserId::new(42))))
        );
        assert_eq!(
            parse_v(".v permit <@42>"),
            Some(Ok(Command::Permit(UserId::new(42))))
        );
        assert_eq!(
            parse_v(".v unpermit <@42>"),
            Some(Ok(Command::Unpermit(UserId::new(42))))
        );
    }
}
