//! Telegram update handlers.
//!
//! Only bot commands are acted on; the core router does authorization.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    match msg.text() {
        Some(text) if text.starts_with('/') => commands::handle_command(msg.clone(), state).await,
        _ => {
            debug!(chat_id = msg.chat.id.0, "ignoring non-command message");
            Ok(())
        }
    }
}
