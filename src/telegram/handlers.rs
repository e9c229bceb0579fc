//! Dispatcher schema and handler dependencies

use std::sync::Arc;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatJoinRequest, Message, ReplyParameters};
use teloxide::utils::command::BotCommands;

use crate::core::error::{AppError, AppResult};
use crate::invites::{ChatContext, InviteIssuer, InviteOutcome, JoinApprover, JoinRequest};
use crate::telegram::bot::Command;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub issuer: Arc<InviteIssuer>,
    pub approver: Arc<JoinApprover>,
}

impl HandlerDeps {
    pub fn new(issuer: Arc<InviteIssuer>, approver: Arc<JoinApprover>) -> Self {
        Self { issuer, approver }
    }
}

/// Creates the dispatcher schema for the bot
///
/// # Arguments
/// * `deps` - Handler dependencies (issuer and approver)
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(join_request_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                match cmd {
                    Command::Getlink => handle_getlink(&bot, &msg, &deps).await,
                    Command::Start => {
                        bot.send_message(msg.chat.id, Command::descriptions().to_string())
                            .await?;
                        Ok(())
                    }
                }
            }
        })
}

fn join_request_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_chat_join_request().endpoint(move |join: ChatJoinRequest| {
        let deps = deps.clone();
        async move {
            let request = join_request_from(&join)?;
            deps.approver.handle(&request).await?;
            Ok(())
        }
    })
}

async fn handle_getlink(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(user) = msg.from.as_ref() else {
        log::warn!("/getlink without a sender in chat {}", msg.chat.id);
        return Ok(());
    };
    let inviter_id = user_id_to_i64(user.id)?;

    let outcome = deps.issuer.request_invite(chat_context(msg), inviter_id).await?;

    let reply = bot.send_message(msg.chat.id, outcome.reply_text());
    match outcome {
        InviteOutcome::NotPrivate => reply.reply_parameters(ReplyParameters::new(msg.id)).await?,
        InviteOutcome::Existing(_) | InviteOutcome::Created(_) => reply.await?,
    };

    Ok(())
}

fn chat_context(msg: &Message) -> ChatContext {
    if msg.chat.is_private() {
        ChatContext::Private
    } else {
        ChatContext::Shared
    }
}

/// Convert a Telegram join request into the transport-neutral form
pub fn join_request_from(join: &ChatJoinRequest) -> AppResult<JoinRequest> {
    Ok(JoinRequest {
        chat_id: join.chat.id.0,
        joiner_id: user_id_to_i64(join.from.id)?,
        invite_link: join.invite_link.as_ref().map(|link| link.invite_link.clone()),
    })
}

fn user_id_to_i64(id: UserId) -> AppResult<i64> {
    i64::try_from(id.0).map_err(|_| AppError::Validation(format!("user id {} out of range", id.0)))
}
