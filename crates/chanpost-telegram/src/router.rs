use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chanpost_core::{
    commands::CommandRouter,
    config::Config,
    content::ContentSource,
    domain::{ChatId, ChatTarget},
    formatting::escape_html,
    jobs::ChannelJobs,
    ledger::{PostLedger, SharedLedger},
    messaging::port::MessagingPort,
    ports::{ImageLookup, TextGenerator},
    publisher::PublishingService,
    scheduler::{jobs_from_config, Scheduler},
    sweeper::LifecycleSweeper,
};
use chanpost_openrouter::OpenRouterClient;
use chanpost_unsplash::UnsplashClient;

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub commands: Arc<CommandRouter>,
    pub scheduler: Scheduler,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Wire the core services over the given ports.
pub fn build_state(
    cfg: Arc<Config>,
    messenger: Arc<dyn MessagingPort>,
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageLookup>,
) -> AppState {
    let ledger = SharedLedger::new(PostLedger::new(cfg.counter_reset));
    let timeout = cfg.external_timeout;

    let publisher = Arc::new(PublishingService::new(
        ContentSource::from_config(&cfg, text, images),
        messenger.clone(),
        ledger.clone(),
        cfg.channel.clone(),
        timeout,
    ));
    let sweeper = Arc::new(LifecycleSweeper::new(
        messenger.clone(),
        ledger.clone(),
        cfg.channel.clone(),
        timeout,
    ));

    let jobs = Arc::new(ChannelJobs::new(
        publisher.clone(),
        sweeper.clone(),
        ledger.clone(),
        messenger.clone(),
        cfg.operator_id,
        cfg.retention,
        timeout,
    ));
    let scheduler = Scheduler::new(jobs_from_config(&cfg), jobs, cfg.poll_interval);

    let commands = Arc::new(CommandRouter::new(
        cfg.operator_id,
        publisher,
        sweeper,
        ledger,
        Some(scheduler.clone()),
        messenger.clone(),
        cfg.retention,
        timeout,
    ));

    AppState {
        cfg,
        commands,
        scheduler,
        messenger,
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "bot started"),
        Err(e) => warn!(error = %e, "get_me failed"),
    }
    info!(
        channel = %cfg.channel,
        operator = cfg.operator_id.0,
        posts_per_day = cfg.post_times.len(),
        retention_secs = cfg.retention.as_secs(),
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let text: Arc<dyn TextGenerator> = Arc::new(OpenRouterClient::from_config(&cfg)?);
    let images: Arc<dyn ImageLookup> = Arc::new(UnsplashClient::from_config(&cfg)?);

    let state = Arc::new(build_state(cfg.clone(), messenger, text, images));

    let cancel = CancellationToken::new();
    let scheduler_task = state.scheduler.spawn(cancel.clone());

    // Startup notification is best-effort.
    {
        let state = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            if let Err(e) = send_startup_notification(&state).await {
                warn!(error = %e, "startup notification failed");
            }
        });
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped, waiting for scheduler");
    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    Ok(())
}

async fn send_startup_notification(state: &AppState) -> chanpost_core::Result<()> {
    let operator_chat = ChatTarget::Id(ChatId(state.cfg.operator_id.0));
    let html = startup_html(&state.cfg, &state.scheduler.status_html().await);
    state.messenger.send_html(&operator_chat, &html).await?;
    Ok(())
}

fn startup_html(cfg: &Config, schedule_html: &str) -> String {
    format!(
        "🟢 <b>Bot started</b>\nChannel: {}\n\n{schedule_html}",
        escape_html(&cfg.channel.to_string())
    )
}
