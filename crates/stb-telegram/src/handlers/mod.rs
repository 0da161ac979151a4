//! Telegram update handlers.
//!
//! One inbound text message maps to one store/engine call and one reply.
//! Handlers never propagate failures: everything internal is converted to
//! a user-visible reply, and send failures are logged and dropped so the
//! dispatch loop keeps running.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use stb_core::domain::ChatId;

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    let reply = if text.starts_with('/') {
        let (command, args) = commands::parse_command(text);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        commands::execute(&state.store, &state.engine, &command, &arg_refs)
    } else {
        commands::unrecognized()
    };

    let sent = if reply.markdown {
        state.messenger.send_markdown(chat_id, &reply.text).await
    } else {
        state.messenger.send_text(chat_id, &reply.text).await
    };
    if let Err(e) = sent {
        warn!(error = %e, "failed to send reply");
    }

    Ok(())
}
