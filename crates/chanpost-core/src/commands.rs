//! Operator command surface.

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::{
    domain::{ChatTarget, MessageId, UserId},
    errors::{with_timeout, Error},
    formatting::{escape_html, posts_html, stats_html},
    ledger::SharedLedger,
    messaging::{port::MessagingPort, types::Command},
    publisher::PublishingService,
    scheduler::Scheduler,
    security::is_operator,
    sweeper::{DeleteOutcome, LifecycleSweeper},
    Result,
};

pub const ACCESS_DENIED: &str = "⛔ Access denied.";

const COMMANDS_HTML: &str = "<b>📋 Commands:</b>\n\
/start, /help, /status - Show this help message\n\
/report, /stats - Post statistics\n\
/createpost - Generate and publish a post now\n\
/deletepost &lt;id&gt; - Delete a post from the channel\n\
/posts - List live posts\n\
/sweep - Delete expired posts now\n\
/admin - Statistics, commands and schedule";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Report,
    CreatePost,
    DeletePost,
    Posts,
    Sweep,
    Admin,
    Unknown,
}

impl CommandKind {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "start" | "help" | "status" => CommandKind::Help,
            "report" | "stats" => CommandKind::Report,
            "createpost" => CommandKind::CreatePost,
            "deletepost" => CommandKind::DeletePost,
            "posts" => CommandKind::Posts,
            "sweep" => CommandKind::Sweep,
            "admin" => CommandKind::Admin,
            _ => CommandKind::Unknown,
        }
    }
}

/// Parse the `/deletepost` argument.
pub fn parse_message_id(arg: &str) -> Result<MessageId> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(Error::Validation("a post id is required".to_string()));
    }
    arg.parse::<i32>()
        .map(MessageId)
        .map_err(|_| Error::Validation(format!("post id must be an integer, got: {arg}")))
}

pub struct CommandRouter {
    operator: UserId,
    publisher: Arc<PublishingService>,
    sweeper: Arc<LifecycleSweeper>,
    ledger: SharedLedger,
    scheduler: Option<Scheduler>,
    messenger: Arc<dyn MessagingPort>,
    retention: Duration,
    timeout: Duration,
}

impl CommandRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        operator: UserId,
        publisher: Arc<PublishingService>,
        sweeper: Arc<LifecycleSweeper>,
        ledger: SharedLedger,
        scheduler: Option<Scheduler>,
        messenger: Arc<dyn MessagingPort>,
        retention: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            operator,
            publisher,
            sweeper,
            ledger,
            scheduler,
            messenger,
            retention,
            timeout,
        }
    }

    /// Handle one command. Errors are only returned when the reply itself fails.
    pub async fn handle(&self, cmd: &Command) -> Result<()> {
        let reply_to = ChatTarget::Id(cmd.chat_id);

        if !is_operator(cmd.user_id, self.operator) {
            debug!(
                user_id = ?cmd.user_id.map(|u| u.0),
                username = cmd.username.as_deref().unwrap_or("unknown"),
                command = %cmd.name,
                "denied command from non-operator"
            );
            return self.reply(&reply_to, ACCESS_DENIED).await;
        }

        match CommandKind::parse(&cmd.name) {
            CommandKind::Help => {
                let body = format!("🤖 <b>Channel bot</b>\n\nBot is running.\n\n{COMMANDS_HTML}");
                self.reply(&reply_to, &body).await
            }

            CommandKind::Report => {
                let stats = self.ledger.stats().await;
                self.reply(&reply_to, &stats_html("📊 <b>Statistics</b>", &stats))
                    .await
            }

            CommandKind::CreatePost => match self.publisher.publish().await {
                Ok(post) => {
                    info!(message_id = %post.record.id, "manual post published");
                    with_timeout(
                        "reply",
                        self.timeout,
                        self.messenger.send_photo(
                            &reply_to,
                            &post.content.image_url,
                            &post.content.text,
                        ),
                    )
                    .await?;
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "manual publish failed");
                    self.reply(
                        &reply_to,
                        &format!("❌ Publish failed: {}", escape_html(&e.to_string())),
                    )
                    .await
                }
            },

            CommandKind::DeletePost => {
                let id = match parse_message_id(&cmd.args) {
                    Ok(id) => id,
                    Err(e) => {
                        let msg = format!(
                            "⚠️ {}\nUsage: /deletepost &lt;id&gt;",
                            escape_html(&e.to_string())
                        );
                        return self.reply(&reply_to, &msg).await;
                    }
                };

                let msg = match self.sweeper.delete_one(id).await {
                    DeleteOutcome::NotFound => format!("❓ Post {id} not found."),
                    DeleteOutcome::Deleted => format!("🗑 Post {id} deleted."),
                    DeleteOutcome::Forgotten { error } => format!(
                        "🗑 Post {id} removed from the ledger, but the channel delete failed: {}",
                        escape_html(&error)
                    ),
                };
                self.reply(&reply_to, &msg).await
            }

            CommandKind::Posts => {
                let records = self.ledger.records().await;
                let max_len = self.messenger.capabilities().max_message_len;
                self.reply(&reply_to, &posts_html(&records, max_len)).await
            }

            CommandKind::Sweep => {
                let report = self.sweeper.sweep_expired(self.retention).await;
                let mut msg = format!("🧹 Removed {} expired post(s).", report.removed.len());
                if report.failed_deletes > 0 {
                    msg.push_str(&format!(
                        "\n⚠️ {} channel delete(s) failed.",
                        report.failed_deletes
                    ));
                }
                self.reply(&reply_to, &msg).await
            }

            CommandKind::Admin => {
                let stats = self.ledger.stats().await;
                let mut body = format!(
                    "{}\n\n{COMMANDS_HTML}",
                    stats_html("🛠 <b>Admin panel</b>", &stats)
                );
                if let Some(scheduler) = &self.scheduler {
                    body.push_str("\n\n");
                    body.push_str(&scheduler.status_html().await);
                }
                self.reply(&reply_to, &body).await
            }

            CommandKind::Unknown => {
                let msg = format!("Unknown command: /{}", escape_html(&cmd.name));
                self.reply(&reply_to, &msg).await
            }
        }
    }

    async fn reply(&self, chat: &ChatTarget, html: &str) -> Result<()> {
        with_timeout("reply", self.timeout, self.messenger.send_html(chat, html)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::ContentSource,
        domain::ChatId,
        ledger::{PostLedger, PostRecord},
        testing::{FakeImages, FakeMessenger, FakeText},
    };
    use chrono::Local;

    const OPERATOR: i64 = 375047802;

    fn router(text: FakeText, messenger: Arc<FakeMessenger>) -> (CommandRouter, SharedLedger) {
        let ledger = SharedLedger::new(PostLedger::default());
        let channel = ChatTarget::Username("@channel".to_string());
        let timeout = Duration::from_secs(1);
        let content = ContentSource::new(
            Arc::new(text),
            Arc::new(FakeImages::found("https://images.example/urban.jpg")),
            "prompt",
            vec!["urban".to_string()],
            "https://placekitten.com/640/360",
            timeout,
        );
        let publisher = Arc::new(PublishingService::new(
            content,
            messenger.clone(),
            ledger.clone(),
            channel.clone(),
            timeout,
        ));
        let sweeper = Arc::new(LifecycleSweeper::new(
            messenger.clone(),
            ledger.clone(),
            channel,
            timeout,
        ));
        let router = CommandRouter::new(
            UserId(OPERATOR),
            publisher,
            sweeper,
            ledger.clone(),
            None,
            messenger,
            Duration::from_secs(24 * 3600),
            timeout,
        );
        (router, ledger)
    }

    fn cmd(user: i64, name: &str, args: &str) -> Command {
        Command {
            chat_id: ChatId(user),
            user_id: Some(UserId(user)),
            username: None,
            name: name.to_string(),
            args: args.to_string(),
        }
    }

    fn channel_photos(m: &FakeMessenger) -> usize {
        m.photos()
            .iter()
            .filter(|(chat, _, _)| *chat == ChatTarget::Username("@channel".to_string()))
            .count()
    }

    #[test]
    fn parses_command_aliases() {
        assert_eq!(CommandKind::parse("start"), CommandKind::Help);
        assert_eq!(CommandKind::parse("STATS"), CommandKind::Report);
        assert_eq!(CommandKind::parse("createpost"), CommandKind::CreatePost);
        assert_eq!(CommandKind::parse("nope"), CommandKind::Unknown);
    }

    #[test]
    fn validates_message_id_argument() {
        assert_eq!(parse_message_id(" 42 ").unwrap(), MessageId(42));
        assert!(matches!(parse_message_id(""), Err(Error::Validation(_))));
        assert!(matches!(parse_message_id("abc"), Err(Error::Validation(_))));
        assert!(matches!(
            parse_message_id("99999999999"),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn report_publish_report_then_denied() {
        let messenger = Arc::new(FakeMessenger::default());
        let (router, ledger) = router(FakeText::ok("Типо живу."), messenger.clone());

        router.handle(&cmd(OPERATOR, "report", "")).await.unwrap();
        let first = messenger.last_html();
        assert!(first.contains("Posts: 0"));
        assert!(first.contains("none yet"));

        router.handle(&cmd(OPERATOR, "createpost", "")).await.unwrap();
        assert_eq!(ledger.lock().await.len(), 1);
        let photos = messenger.photos();
        let reply = photos.last().unwrap();
        assert_eq!(reply.0, ChatTarget::Id(ChatId(OPERATOR)));
        assert_eq!(reply.1, "https://images.example/urban.jpg");
        assert_eq!(reply.2, "Типо живу.");

        router.handle(&cmd(OPERATOR, "report", "")).await.unwrap();
        let second = messenger.last_html();
        assert!(second.contains("Posts: 1"));
        assert!(!second.contains("none yet"));

        router.handle(&cmd(12345, "createpost", "")).await.unwrap();
        assert_eq!(messenger.last_html(), ACCESS_DENIED);
        assert_eq!(ledger.lock().await.len(), 1);
        assert_eq!(ledger.stats().await.post_count, 1);
        assert_eq!(channel_photos(&messenger), 1);
    }

    #[tokio::test]
    async fn unauthorized_commands_have_no_side_effects() {
        let messenger = Arc::new(FakeMessenger::default());
        let (router, ledger) = router(FakeText::ok("text"), messenger.clone());
        ledger.lock().await.record(PostRecord {
            id: MessageId(3),
            published_at: Local::now() - chrono::Duration::hours(48),
        });

        for (name, args) in [
            ("start", ""),
            ("report", ""),
            ("createpost", ""),
            ("deletepost", "3"),
            ("sweep", ""),
            ("admin", ""),
            ("whatever", ""),
        ] {
            router.handle(&cmd(777, name, args)).await.unwrap();
            assert_eq!(messenger.last_html(), ACCESS_DENIED);
        }

        let missing_user = Command {
            user_id: None,
            ..cmd(777, "createpost", "")
        };
        router.handle(&missing_user).await.unwrap();

        assert!(messenger.photos().is_empty());
        assert!(messenger.deleted().is_empty());
        assert!(ledger.lock().await.contains(MessageId(3)));
        assert_eq!(ledger.stats().await.post_count, 1);
    }

    #[tokio::test]
    async fn deletepost_validation_not_found_and_success() {
        let messenger = Arc::new(FakeMessenger::default());
        let (router, ledger) = router(FakeText::ok("text"), messenger.clone());
        ledger.lock().await.record(PostRecord {
            id: MessageId(5),
            published_at: Local::now(),
        });

        router.handle(&cmd(OPERATOR, "deletepost", "five")).await.unwrap();
        assert!(messenger.last_html().contains("Usage: /deletepost"));

        router.handle(&cmd(OPERATOR, "deletepost", "")).await.unwrap();
        assert!(messenger.last_html().contains("Usage: /deletepost"));

        router.handle(&cmd(OPERATOR, "deletepost", "6")).await.unwrap();
        assert!(messenger.last_html().contains("not found"));
        assert!(messenger.deleted().is_empty());

        router.handle(&cmd(OPERATOR, "deletepost", "5")).await.unwrap();
        assert!(messenger.last_html().contains("Post 5 deleted"));
        assert_eq!(messenger.deleted(), vec![MessageId(5)]);
        assert!(ledger.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_createpost_replies_with_error() {
        let messenger = Arc::new(FakeMessenger::default());
        let (router, ledger) = router(FakeText::failing(), messenger.clone());

        router.handle(&cmd(OPERATOR, "createpost", "")).await.unwrap();
        assert!(messenger.last_html().starts_with("❌ Publish failed"));
        assert!(ledger.lock().await.is_empty());
        assert!(messenger.photos().is_empty());
    }

    #[tokio::test]
    async fn admin_lists_stats_and_commands() {
        let messenger = Arc::new(FakeMessenger::default());
        let (router, _) = router(FakeText::ok("text"), messenger.clone());

        router.handle(&cmd(OPERATOR, "admin", "")).await.unwrap();
        let html = messenger.last_html();
        assert!(html.contains("Admin panel"));
        assert!(html.contains("Posts: 0"));
        assert!(html.contains("/deletepost &lt;id&gt;"));
    }

    #[tokio::test]
    async fn posts_and_sweep_commands() {
        let messenger = Arc::new(FakeMessenger::default());
        let (router, ledger) = router(FakeText::ok("text"), messenger.clone());
        {
            let mut l = ledger.lock().await;
            l.record(PostRecord {
                id: MessageId(1),
                published_at: Local::now() - chrono::Duration::hours(30),
            });
            l.record(PostRecord {
                id: MessageId(2),
                published_at: Local::now(),
            });
        }

        router.handle(&cmd(OPERATOR, "posts", "")).await.unwrap();
        let html = messenger.last_html();
        assert!(html.contains("<code>1</code>"));
        assert!(html.contains("<code>2</code>"));

        router.handle(&cmd(OPERATOR, "sweep", "")).await.unwrap();
        assert!(messenger.last_html().contains("Removed 1 expired post(s)."));
        assert_eq!(messenger.deleted(), vec![MessageId(1)]);
        assert!(ledger.lock().await.contains(MessageId(2)));
    }

    #[tokio::test]
    async fn unknown_command_from_operator() {
        let messenger = Arc::new(FakeMessenger::default());
        let (router, _) = router(FakeText::ok("text"), messenger.clone());
        router.handle(&cmd(OPERATOR, "<b>", "")).await.unwrap();
        assert_eq!(messenger.last_html(), "Unknown command: /&lt;b&gt;");
    }
}
