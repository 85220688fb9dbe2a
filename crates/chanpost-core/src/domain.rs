use std::{fmt, str::FromStr};

use crate::errors::Error;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric), assigned by the transport on send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a message goes: a numeric chat or a public `@channel`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatTarget {
    Id(ChatId),
    Username(String),
}

impl From<ChatId> for ChatTarget {
    fn from(id: ChatId) -> Self {
        ChatTarget::Id(id)
    }
}

impl FromStr for ChatTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix('@') {
            if name.is_empty() {
                return Err(Error::Config("channel username is empty".to_string()));
            }
            return Ok(ChatTarget::Username(s.to_string()));
        }
        s.parse::<i64>()
            .map(|id| ChatTarget::Id(ChatId(id)))
            .map_err(|_| Error::Config(format!("invalid chat id: {s}")))
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{}", id.0),
            ChatTarget::Username(name) => f.write_str(name),
        }
    }
}
