//! Telegram adapter (teloxide).
//!
//! This crate implements the `chanpost-core` MessagingPort over Telegram Bot API
//! and wires the long-polling dispatcher to the core command router.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode, Recipient},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use chanpost_core::{
    domain::{ChatTarget, MessageId},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_recipient(chat: &ChatTarget) -> Recipient {
        match chat {
            ChatTarget::Id(id) => Recipient::Id(teloxide::types::ChatId(id.0)),
            ChatTarget::Username(name) => Recipient::ChannelUsername(name.clone()),
        }
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!(after_secs = d.as_secs(), "telegram rate limited, retrying");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
            max_caption_len: 1024,
        }
    }

    async fn send_html(&self, chat: &ChatTarget, html: &str) -> Result<MessageId> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_recipient(chat), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;
        Ok(MessageId(msg.id.0))
    }

    async fn send_photo(&self, chat: &ChatTarget, image_url: &str, caption: &str) -> Result<MessageId> {
        let url = reqwest::Url::parse(image_url)
            .map_err(|e| Error::Validation(format!("invalid image url {image_url}: {e}")))?;

        let msg = self
            .with_retry(|| {
                self.bot
                    .send_photo(Self::tg_recipient(chat), InputFile::url(url.clone()))
                    .caption(caption.to_string())
            })
            .await?;
        Ok(MessageId(msg.id.0))
    }

    async fn delete_message(&self, chat: &ChatTarget, message_id: MessageId) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_recipient(chat), Self::tg_msg_id(message_id))
        })
        .await?;
        Ok(())
    }
}
