use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::GroupGateway;
use crate::core::error::AppResult;
use crate::storage::{InviteRecord, LinkStore};

/// Where the `/getlink` command was sent from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatContext {
    /// One-to-one chat with the bot
    Private,
    /// Group, supergroup or channel
    Shared,
}

/// Result of an invite request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteOutcome {
    /// Link issued earlier, returned unchanged
    Existing(InviteRecord),
    /// Link created and stored by this request
    Created(InviteRecord),
    /// Request came from a shared chat; nothing was created
    NotPrivate,
}

impl InviteOutcome {
    /// Text sent back to the requester
    pub fn reply_text(&self) -> String {
        match self {
            InviteOutcome::Existing(record) => format!("🔗 Your invite link:\n{}", record.link),
            InviteOutcome::Created(record) => format!("✅ Your invite link has been created:\n{}", record.link),
            InviteOutcome::NotPrivate => "Please use this command in a private chat.".to_string(),
        }
    }
}

/// Name given to an inviter's link in the group's invite list
pub fn link_name(inviter_id: i64) -> String {
    format!("invite_{}", inviter_id)
}

/// Issues one personal invite link per inviter
pub struct InviteIssuer {
    store: Arc<dyn LinkStore>,
    gateway: Arc<dyn GroupGateway>,
    // One lock per inviter, held across lookup, creation and persist so an
    // inviter never gets two links; other inviters are not blocked
    issue_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl InviteIssuer {
    pub fn new(store: Arc<dyn LinkStore>, gateway: Arc<dyn GroupGateway>) -> Self {
        Self {
            store,
            gateway,
            issue_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Return the inviter's link, creating it on first request
    ///
    /// # Errors
    /// Storage errors, and Telegram errors from link creation. A failed creation
    /// persists nothing.
    pub async fn request_invite(&self, context: ChatContext, inviter_id: i64) -> AppResult<InviteOutcome> {
        if context != ChatContext::Private {
            log::debug!("Ignoring invite request from {} outside a private chat", inviter_id);
            return Ok(InviteOutcome::NotPrivate);
        }

        let lock = self.inviter_lock(inviter_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.issue(inviter_id).await
        };
        self.release_lock(inviter_id, lock).await;
        outcome
    }

    async fn inviter_lock(&self, inviter_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.issue_locks.lock().await;
        Arc::clone(locks.entry(inviter_id).or_default())
    }

    // Drops the map entry once no other request holds or waits on it
    async fn release_lock(&self, inviter_id: i64, lock: Arc<Mutex<()>>) {
        let mut locks = self.issue_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&inviter_id);
        }
    }

    async fn issue(&self, inviter_id: i64) -> AppResult<InviteOutcome> {
        if let Some(record) = self.store.get(inviter_id).await? {
            return Ok(InviteOutcome::Existing(record));
        }

        let link = self.gateway.create_join_request_link(&link_name(inviter_id)).await?;
        let record = InviteRecord::new(inviter_id, link);
        self.store.put(&record).await?;

        log::info!("Created invite link for {}: {}", inviter_id, record.link);
        Ok(InviteOutcome::Created(record))
    }
}
