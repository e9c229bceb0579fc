use std::sync::Arc;

use super::GroupGateway;
use crate::core::error::AppResult;
use crate::report::Reporter;
use crate::storage::LinkStore;

/// A pending request to join the tracked group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub chat_id: i64,
    pub joiner_id: i64,
    /// Invite link the joiner used, if Telegram reported one
    pub invite_link: Option<String>,
}

/// How a join request was attributed before approval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No invite link on the request
    Untracked,
    /// Link not issued by this bot (or lookup failed)
    Unattributed,
    /// Link belongs to `inviter_id`; a report row was attempted
    Attributed { inviter_id: i64 },
}

/// Approves every join request, reporting the inviter when the link is known
pub struct JoinApprover {
    store: Arc<dyn LinkStore>,
    gateway: Arc<dyn GroupGateway>,
    reporter: Reporter,
}

impl JoinApprover {
    pub fn new(store: Arc<dyn LinkStore>, gateway: Arc<dyn GroupGateway>, reporter: Reporter) -> Self {
        Self {
            store,
            gateway,
            reporter,
        }
    }

    /// Attribute and approve one join request
    ///
    /// Attribution never blocks approval: lookup and report failures are logged
    /// and the request is approved anyway.
    ///
    /// # Errors
    /// Only the approval call itself.
    pub async fn handle(&self, request: &JoinRequest) -> AppResult<JoinOutcome> {
        let outcome = self.attribute(request).await;

        self.gateway
            .approve_join_request(request.chat_id, request.joiner_id)
            .await?;

        log::info!(
            "Approved join request of {} to {} ({:?})",
            request.joiner_id,
            request.chat_id,
            outcome
        );
        Ok(outcome)
    }

    async fn attribute(&self, request: &JoinRequest) -> JoinOutcome {
        let Some(link) = request.invite_link.as_deref() else {
            return JoinOutcome::Untracked;
        };

        match self.store.find_by_link(link).await {
            Ok(Some(record)) => {
                self.reporter.record(record.inviter_id, request.joiner_id).await;
                JoinOutcome::Attributed {
                    inviter_id: record.inviter_id,
                }
            }
            Ok(None) => JoinOutcome::Unattributed,
            Err(e) => {
                log::error!("Failed to look up invite link {}: {}", link, e);
                JoinOutcome::Unattributed
            }
        }
    }
}
