use std::fmt;

use splitbot_common::InboundMessage;

/// Why a message warrants a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    DirectMessage,
    Mentioned,
    RoleMentioned,
    ReplyToBot,
    Keyword,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DirectMessage => "direct message",
            Self::Mentioned => "mention",
            Self::RoleMentioned => "role mention",
            Self::ReplyToBot => "reply to bot",
            Self::Keyword => "keyword",
        };
        f.write_str(s)
    }
}

/// Decide whether `msg` should be answered. The first matching rule wins.
///
/// Messages written by bot accounts never trigger. The keyword is matched
/// case-insensitively anywhere in the content; an empty keyword never matches.
pub fn evaluate(msg: &InboundMessage, keyword: &str) -> Option<TriggerReason> {
    if msg.author.is_bot {
        return None;
    }

    if msg.channel_is_direct {
        Some(TriggerReason::DirectMessage)
    } else if msg.mentions_bot {
        Some(TriggerReason::Mentioned)
    } else if msg.mentions_bot_role {
        Some(TriggerReason::RoleMentioned)
    } else if msg.is_reply_to_bot {
        Some(TriggerReason::ReplyToBot)
    } else if contains_keyword(&msg.content, keyword) {
        Some(TriggerReason::Keyword)
    } else {
        None
    }
}

fn contains_keyword(content: &str, keyword: &str) -> bool {
    let keyword = keyword.trim();
    !keyword.is_empty() && content.to_lowercase().contains(&keyword.to_lowercase())
}
