use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info};

use chanpost_core::{
    domain::{ChatId, UserId},
    messaging::types::Command,
};

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn to_command(msg: &Message, text: &str) -> Command {
    let (name, args) = parse_command(text);
    let from = msg.from();
    Command {
        chat_id: ChatId(msg.chat.id.0),
        user_id: from.map(|u| UserId(u.id.0 as i64)),
        username: from.and_then(|u| u.username.clone()),
        name,
        args,
    }
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let cmd = to_command(&msg, text);

    info!(
        command = %cmd.name,
        user_id = ?cmd.user_id.map(|u| u.0),
        chat_id = cmd.chat_id.0,
        "received command"
    );

    // Reply failures are logged; the dispatcher keeps polling.
    if let Err(e) = state.commands.handle(&cmd).await {
        error!(command = %cmd.name, error = %e, "command reply failed");
    }
    Ok(())
}
