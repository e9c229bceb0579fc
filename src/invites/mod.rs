//! Invite issuing and join attribution
//!
//! - `issuer`: hands out one join-request invite link per inviter
//! - `approver`: approves join requests and reports who brought whom

pub mod approver;
pub mod issuer;

use async_trait::async_trait;

use crate::core::error::AppResult;

pub use approver::{JoinApprover, JoinOutcome, JoinRequest};
pub use issuer::{ChatContext, InviteIssuer, InviteOutcome, link_name};

/// Operations the bot performs on the tracked group
#[async_trait]
pub trait GroupGateway: Send + Sync {
    /// Create a named invite link that requires join-request approval
    async fn create_join_request_link(&self, name: &str) -> AppResult<String>;

    /// Approve `user_id`'s pending request to join `chat_id`
    async fn approve_join_request(&self, chat_id: i64, user_id: i64) -> AppResult<()>;
}
