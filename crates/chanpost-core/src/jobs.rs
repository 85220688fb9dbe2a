use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::info;

use crate::{
    domain::{ChatId, ChatTarget, UserId},
    errors::with_timeout,
    formatting::stats_html,
    ledger::SharedLedger,
    messaging::port::MessagingPort,
    publisher::PublishingService,
    scheduler::{JobAction, JobHandler},
    sweeper::LifecycleSweeper,
    Result,
};

/// Runs scheduled actions against the channel.
pub struct ChannelJobs {
    publisher: Arc<PublishingService>,
    sweeper: Arc<LifecycleSweeper>,
    ledger: SharedLedger,
    messenger: Arc<dyn MessagingPort>,
    operator_chat: ChatTarget,
    retention: Duration,
    timeout: Duration,
}

impl ChannelJobs {
    pub fn new(
        publisher: Arc<PublishingService>,
        sweeper: Arc<LifecycleSweeper>,
        ledger: SharedLedger,
        messenger: Arc<dyn MessagingPort>,
        operator: UserId,
        retention: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            publisher,
            sweeper,
            ledger,
            messenger,
            // A private chat with the operator has the operator's user id.
            operator_chat: ChatTarget::Id(ChatId(operator.0)),
            retention,
            timeout,
        }
    }

    async fn send_report(&self) -> Result<()> {
        let stats = self.ledger.stats().await;
        let html = stats_html("📋 <b>Daily report</b>", &stats);
        with_timeout(
            "daily report",
            self.timeout,
            self.messenger.send_html(&self.operator_chat, &html),
        )
        .await?;
        info!(posts = stats.post_count, "sent daily report");
        Ok(())
    }
}

#[async_trait]
impl JobHandler for ChannelJobs {
    async fn run(&self, action: JobAction) -> Result<()> {
        match action {
            JobAction::Publish => {
                self.publisher.publish().await?;
            }
            JobAction::Report => self.send_report().await?,
            JobAction::Sweep => {
                self.sweeper.sweep_expired(self.retention).await;
            }
        }
        Ok(())
    }
}
