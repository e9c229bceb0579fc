//! [`GroupGateway`] backed by the Telegram Bot API

use async_trait::async_trait;
use teloxide::prelude::*;

use crate::core::error::{AppError, AppResult};
use crate::invites::GroupGateway;

/// Creates links on, and approves joins to, the tracked group
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
    group_id: ChatId,
}

impl TelegramGateway {
    pub fn new(bot: Bot, group_id: ChatId) -> Self {
        Self { bot, group_id }
    }
}

#[async_trait]
impl GroupGateway for TelegramGateway {
    async fn create_join_request_link(&self, name: &str) -> AppResult<String> {
        let link = self
            .bot
            .create_chat_invite_link(self.group_id)
            .name(name)
            .creates_join_request(true)
            .await?;
        Ok(link.invite_link)
    }

    async fn approve_join_request(&self, chat_id: i64, user_id: i64) -> AppResult<()> {
        let user_id = u64::try_from(user_id).map_err(|_| AppError::Validation(format!("invalid user id {}", user_id)))?;
        self.bot.approve_chat_join_request(ChatId(chat_id), UserId(user_id)).await?;
        Ok(())
    }
}
