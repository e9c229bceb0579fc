//! Invite issuing and join attribution, end to end over a real SQLite store
//!
//! Run with: cargo test --test invite_flow_test

mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;

use common::{FakeGateway, RecordingSink, temp_store};
use invitrack::invites::{ChatContext, InviteIssuer, InviteOutcome, JoinApprover, JoinOutcome, JoinRequest};
use invitrack::report::Reporter;
use invitrack::storage::{InviteRecord, LinkStore};

const GROUP: i64 = -1001234567890;

fn join(joiner_id: i64, invite_link: Option<&str>) -> JoinRequest {
    JoinRequest {
        chat_id: GROUP,
        joiner_id,
        invite_link: invite_link.map(str::to_string),
    }
}

// ============================================================================
// Invite issuing
// ============================================================================

mod issuer_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_request_creates_and_persists() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        let issuer = InviteIssuer::new(store.clone(), gateway.clone());

        let outcome = issuer.request_invite(ChatContext::Private, 42).await.unwrap();

        let InviteOutcome::Created(record) = outcome else {
            panic!("expected a new link, got {:?}", outcome);
        };
        assert_eq!(record.inviter_id, 42);
        assert_eq!(gateway.created_names(), vec!["invite_42".to_string()]);
        assert_eq!(store.get(42).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_repeat_request_is_idempotent() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        let issuer = InviteIssuer::new(store.clone(), gateway.clone());

        let first = issuer.request_invite(ChatContext::Private, 42).await.unwrap();
        let second = issuer.request_invite(ChatContext::Private, 42).await.unwrap();

        let (InviteOutcome::Created(created), InviteOutcome::Existing(existing)) = (first, second) else {
            panic!("expected Created then Existing");
        };
        assert_eq!(created, existing);
        assert_eq!(gateway.created_names().len(), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_inviters_get_distinct_links() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        let issuer = InviteIssuer::new(store.clone(), gateway.clone());

        let a = issuer.request_invite(ChatContext::Private, 1).await.unwrap();
        let b = issuer.request_invite(ChatContext::Private, 2).await.unwrap();

        let (InviteOutcome::Created(a), InviteOutcome::Created(b)) = (a, b) else {
            panic!("expected two new links");
        };
        assert_ne!(a.link, b.link);
        assert_eq!(store.find_by_link(&a.link).await.unwrap().map(|r| r.inviter_id), Some(1));
        assert_eq!(store.find_by_link(&b.link).await.unwrap().map(|r| r.inviter_id), Some(2));
    }

    #[tokio::test]
    async fn test_shared_chat_never_creates_a_link() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        let issuer = InviteIssuer::new(store.clone(), gateway.clone());

        let outcome = issuer.request_invite(ChatContext::Shared, 42).await.unwrap();

        assert_eq!(outcome, InviteOutcome::NotPrivate);
        assert!(gateway.created_names().is_empty());
        assert_eq!(store.get(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shared_chat_does_not_reveal_existing_link() {
        let (_dir, store) = temp_store();
        store.put(&InviteRecord::new(42, "https://t.me/+L")).await.unwrap();
        let issuer = InviteIssuer::new(store.clone(), FakeGateway::new());

        let outcome = issuer.request_invite(ChatContext::Shared, 42).await.unwrap();

        assert_eq!(outcome, InviteOutcome::NotPrivate);
    }

    #[tokio::test]
    async fn test_link_creation_failure_persists_nothing() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        gateway.fail_link_creation();
        let issuer = InviteIssuer::new(store.clone(), gateway.clone());

        let result = issuer.request_invite(ChatContext::Private, 42).await;

        assert!(result.is_err());
        assert_eq!(store.get(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_requests_from_one_inviter_issue_one_link() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        let issuer = Arc::new(InviteIssuer::new(store.clone(), gateway.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let issuer = Arc::clone(&issuer);
                tokio::spawn(async move { issuer.request_invite(ChatContext::Private, 7).await })
            })
            .collect();

        let mut links = Vec::new();
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                InviteOutcome::Created(record) | InviteOutcome::Existing(record) => links.push(record.link),
                InviteOutcome::NotPrivate => panic!("private request rejected"),
            }
        }

        links.dedup();
        assert_eq!(links.len(), 1);
        assert_eq!(gateway.created_names().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_link_creation_does_not_stall_other_inviters() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        let held = gateway.hold_link("invite_1");
        let issuer = Arc::new(InviteIssuer::new(store.clone(), gateway.clone()));

        let slow = {
            let issuer = Arc::clone(&issuer);
            tokio::spawn(async move { issuer.request_invite(ChatContext::Private, 1).await })
        };
        held.entered.notified().await;

        let other = tokio::time::timeout(Duration::from_secs(5), issuer.request_invite(ChatContext::Private, 2))
            .await
            .expect("inviter 2 waited on inviter 1")
            .unwrap();
        assert!(matches!(other, InviteOutcome::Created(_)));

        held.release.notify_one();
        assert!(matches!(slow.await.unwrap().unwrap(), InviteOutcome::Created(_)));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }
}

// ============================================================================
// Join approval and attribution
// ============================================================================

mod approver_tests {
    use super::*;
    use common::BrokenStore;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_known_link_is_attributed_and_approved() {
        let (_dir, store) = temp_store();
        store.put(&InviteRecord::new(42, "L")).await.unwrap();
        let gateway = FakeGateway::new();
        let sink = RecordingSink::new();
        let approver = JoinApprover::new(store.clone(), gateway.clone(), Reporter::new(sink.clone()));

        let outcome = approver.handle(&join(1001, Some("L"))).await.unwrap();

        assert_eq!(outcome, JoinOutcome::Attributed { inviter_id: 42 });
        assert_eq!(gateway.approvals(), vec![(GROUP, 1001)]);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].inviter_id, events[0].joiner_id), (42, 1001));
        assert_eq!(events[0].row()[2].len(), "YYYY-MM-DD HH:MM:SS".len());
    }

    #[tokio::test]
    async fn test_join_without_link_is_approved_untracked() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        let sink = RecordingSink::new();
        let approver = JoinApprover::new(store.clone(), gateway.clone(), Reporter::new(sink.clone()));

        let outcome = approver.handle(&join(1001, None)).await.unwrap();

        assert_eq!(outcome, JoinOutcome::Untracked);
        assert_eq!(gateway.approvals(), vec![(GROUP, 1001)]);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_link_is_approved_without_report() {
        let (_dir, store) = temp_store();
        store.put(&InviteRecord::new(42, "L")).await.unwrap();
        let gateway = FakeGateway::new();
        let sink = RecordingSink::new();
        let approver = JoinApprover::new(store.clone(), gateway.clone(), Reporter::new(sink.clone()));

        let outcome = approver.handle(&join(1001, Some("https://t.me/+someone-else"))).await.unwrap();

        assert_eq!(outcome, JoinOutcome::Unattributed);
        assert_eq!(gateway.approvals(), vec![(GROUP, 1001)]);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_failing_report_does_not_block_approval() {
        let (_dir, store) = temp_store();
        store.put(&InviteRecord::new(42, "L")).await.unwrap();
        let gateway = FakeGateway::new();
        let approver = JoinApprover::new(store.clone(), gateway.clone(), Reporter::new(RecordingSink::failing()));

        let outcome = approver.handle(&join(1001, Some("L"))).await.unwrap();

        assert_eq!(outcome, JoinOutcome::Attributed { inviter_id: 42 });
        assert_eq!(gateway.approvals(), vec![(GROUP, 1001)]);
    }

    #[tokio::test]
    async fn test_store_failure_still_approves_unattributed() {
        let gateway = FakeGateway::new();
        let sink = RecordingSink::new();
        let approver = JoinApprover::new(Arc::new(BrokenStore), gateway.clone(), Reporter::new(sink.clone()));

        let outcome = approver.handle(&join(5, Some("https://t.me/+L"))).await.unwrap();

        assert_eq!(outcome, JoinOutcome::Unattributed);
        assert_eq!(gateway.approvals(), vec![(GROUP, 5)]);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_approval_failure_is_returned() {
        let (_dir, store) = temp_store();
        let gateway = FakeGateway::new();
        gateway.fail_approvals();
        let approver = JoinApprover::new(store.clone(), gateway.clone(), Reporter::new(RecordingSink::new()));

        assert!(approver.handle(&join(1001, None)).await.is_err());
    }
}

// ============================================================================
// Issue then join
// ============================================================================

#[tokio::test]
async fn test_issued_link_attributes_joiner_to_inviter() {
    let (_dir, store) = temp_store();
    let gateway = FakeGateway::new();
    let sink = RecordingSink::new();
    let issuer = InviteIssuer::new(store.clone(), gateway.clone());
    let approver = JoinApprover::new(store.clone(), gateway.clone(), Reporter::new(sink.clone()));

    let InviteOutcome::Created(record) = issuer.request_invite(ChatContext::Private, 5).await.unwrap() else {
        panic!("expected a new link");
    };
    approver.handle(&join(77, Some(&record.link))).await.unwrap();
    approver.handle(&join(78, Some(&record.link))).await.unwrap();

    let pairs: Vec<(i64, i64)> = sink.events().iter().map(|e| (e.inviter_id, e.joiner_id)).collect();
    assert_eq!(pairs, vec![(5, 77), (5, 78)]);
    assert_eq!(gateway.approvals(), vec![(GROUP, 77), (GROUP, 78)]);
}
