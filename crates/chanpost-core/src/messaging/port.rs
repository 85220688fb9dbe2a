use async_trait::async_trait;

use crate::{
    domain::{ChatTarget, MessageId},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Transport port used by the core.
///
/// Channel posts and operator replies both go through here; a reply is just a
/// send to the requester's chat.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat: &ChatTarget, html: &str) -> Result<MessageId>;

    /// Send a photo by URL with a plain-text caption.
    async fn send_photo(&self, chat: &ChatTarget, image_url: &str, caption: &str)
        -> Result<MessageId>;

    async fn delete_message(&self, chat: &ChatTarget, message_id: MessageId) -> Result<()>;
}
