//! One publish cycle: generate, post to the channel, record.

use std::{sync::Arc, time::Duration};

use chrono::Local;
use tracing::info;

use crate::{
    content::{ContentSource, GeneratedPost},
    domain::ChatTarget,
    errors::{with_timeout, PublishError},
    formatting::truncate_chars,
    ledger::{PostRecord, SharedLedger},
    messaging::port::MessagingPort,
};

/// A post that made it to the channel and into the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedPost {
    pub record: PostRecord,
    pub content: GeneratedPost,
}

pub struct PublishingService {
    content: ContentSource,
    messenger: Arc<dyn MessagingPort>,
    ledger: SharedLedger,
    channel: ChatTarget,
    timeout: Duration,
}

impl PublishingService {
    pub fn new(
        content: ContentSource,
        messenger: Arc<dyn MessagingPort>,
        ledger: SharedLedger,
        channel: ChatTarget,
        timeout: Duration,
    ) -> Self {
        Self {
            content,
            messenger,
            ledger,
            channel,
            timeout,
        }
    }

    pub fn channel(&self) -> &ChatTarget {
        &self.channel
    }

    /// Run one cycle. On error nothing is recorded and nothing is retried.
    pub async fn publish(&self) -> Result<PublishedPost, PublishError> {
        let _cycle = self.ledger.begin_cycle().await;

        let mut content = self
            .content
            .generate()
            .await
            .map_err(PublishError::Generation)?;

        let max_caption = self.messenger.capabilities().max_caption_len;
        content.text = truncate_chars(&content.text, max_caption);

        let message_id = with_timeout(
            "channel publish",
            self.timeout,
            self.messenger
                .send_photo(&self.channel, &content.image_url, &content.text),
        )
        .await
        .map_err(PublishError::Transport)?;

        let record = PostRecord {
            id: message_id,
            published_at: Local::now(),
        };
        self.ledger.lock().await.record(record);

        info!(
            channel = %self.channel,
            message_id = %message_id,
            "published post"
        );
        Ok(PublishedPost { record, content })
    }
}
