//! Expiry and explicit deletion of channel posts.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::{
    domain::{ChatTarget, MessageId},
    errors::with_timeout,
    ledger::SharedLedger,
    messaging::port::MessagingPort,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Ledger entries removed, oldest first.
    pub removed: Vec<MessageId>,
    /// How many of those the transport failed to delete.
    pub failed_deletes: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    Deleted,
    /// Dropped from the ledger, but the transport delete failed.
    Forgotten { error: String },
}

pub struct LifecycleSweeper {
    messenger: Arc<dyn MessagingPort>,
    ledger: SharedLedger,
    channel: ChatTarget,
    timeout: Duration,
}

impl LifecycleSweeper {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        ledger: SharedLedger,
        channel: ChatTarget,
        timeout: Duration,
    ) -> Self {
        Self {
            messenger,
            ledger,
            channel,
            timeout,
        }
    }

    pub async fn sweep_expired(&self, retention: Duration) -> SweepReport {
        self.sweep_expired_at(Local::now(), retention).await
    }

    /// Delete every post older than `retention` at `now`.
    ///
    /// Entries leave the ledger whether or not the delete call succeeds.
    pub async fn sweep_expired_at(&self, now: DateTime<Local>, retention: Duration) -> SweepReport {
        let _cycle = self.ledger.begin_cycle().await;

        let expired = self.ledger.lock().await.expired(now, retention);
        let mut report = SweepReport::default();
        for record in expired {
            if let Err(e) = self.delete_from_channel(record.id).await {
                warn!(message_id = %record.id, error = %e, "failed to delete expired post");
                report.failed_deletes += 1;
            }
            self.ledger.lock().await.remove(record.id);
            report.removed.push(record.id);
        }

        if !report.removed.is_empty() {
            info!(
                removed = report.removed.len(),
                failed = report.failed_deletes,
                "swept expired posts"
            );
        }
        report
    }

    /// Delete one post on explicit request.
    pub async fn delete_one(&self, id: MessageId) -> DeleteOutcome {
        let _cycle = self.ledger.begin_cycle().await;

        if !self.ledger.lock().await.contains(id) {
            return DeleteOutcome::NotFound;
        }

        let res = self.delete_from_channel(id).await;
        self.ledger.lock().await.remove(id);

        match res {
            Ok(()) => {
                info!(message_id = %id, "deleted post");
                DeleteOutcome::Deleted
            }
            Err(e) => {
                warn!(message_id = %id, error = %e, "delete failed, forgetting post anyway");
                DeleteOutcome::Forgotten {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn delete_from_channel(&self, id: MessageId) -> crate::Result<()> {
        with_timeout(
            "channel delete",
            self.timeout,
            self.messenger.delete_message(&self.channel, id),
        )
        .await
    }
}
