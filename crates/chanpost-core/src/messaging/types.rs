use crate::domain::{ChatId, UserId};

/// An inbound bot command, already split into name and argument string.
///
/// Telegram-specific parsing (`/cmd@botname`) lives in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub name: String,
    pub args: String,
}

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
    pub max_caption_len: usize,
}

impl Default for MessagingCapabilities {
    fn default() -> Self {
        // Telegram Bot API limits.
        Self {
            max_message_len: 4096,
            max_caption_len: 1024,
        }
    }
}
