//! Telegram adapter (teloxide).
//!
//! This crate implements the `stb-core` MessagingPort over the Telegram
//! Bot API and hosts the command router.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use stb_core::{domain::ChatId, errors::Error, ports::MessagingPort, Result};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
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
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
        })
        .await?;
        Ok(())
    }

    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
                .parse_mode(ParseMode::Markdown)
        })
        .await?;
        Ok(())
    }
}
