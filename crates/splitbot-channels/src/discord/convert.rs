use chrono::{DateTime, Utc};
use serenity::all::{self as serenity_model, RoleId, Timestamp};
use splitbot_common::{Author, ChannelId, HistoryMessage, InboundMessage, MessageId, UserId};

pub fn author_from_user(user: &serenity_model::User) -> Author {
    Author {
        id: UserId::from_string(user.id.to_string()),
        name: user.name.clone(),
        is_bot: user.bot,
    }
}

pub fn to_utc(timestamp: &Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

/// Convert a serenity message into an `InboundMessage`.
///
/// `mentions_bot_role` must be resolved by the caller since it needs the
/// bot's guild roles.
pub fn to_inbound(
    msg: &serenity_model::Message,
    bot_id: serenity_model::UserId,
    mentions_bot_role: bool,
) -> InboundMessage {
    InboundMessage {
        id: MessageId::from_string(msg.id.to_string()),
        channel_id: ChannelId::from_string(msg.channel_id.to_string()),
        author: author_from_user(&msg.author),
        content: msg.content.clone(),
        channel_is_direct: msg.guild_id.is_none(),
        mentions_bot: msg.mentions_user_id(bot_id),
        mentions_bot_role,
        is_reply_to_bot: msg
            .referenced_message
            .as_ref()
            .is_some_and(|referenced| referenced.author.id == bot_id),
        created_at: to_utc(&msg.timestamp),
    }
}

pub fn to_history(msg: &serenity_model::Message) -> HistoryMessage {
    HistoryMessage {
        author: author_from_user(&msg.author),
        content: msg.content.clone(),
        created_at: to_utc(&msg.timestamp),
    }
}

/// Whether any mentioned role is one the bot holds.
pub fn mentions_any_role(mentioned: &[RoleId], held: &[RoleId]) -> bool {
    mentioned.iter().any(|role| held.contains(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_convert_to_utc() {
        let ts = Timestamp::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(to_utc(&ts).timestamp(), 1_700_000_000);
    }

    #[test]
    fn role_mentions_require_a_shared_role() {
        let ops = RoleId::new(1);
        let oncall = RoleId::new(2);
        let devs = RoleId::new(3);
        assert!(mentions_any_role(&[ops, devs], &[oncall, devs]));
        assert!(!mentions_any_role(&[ops], &[oncall]));
        assert!(!mentions_any_role(&[], &[oncall]));
    }
}
