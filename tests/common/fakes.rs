use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::Notify;

use invitrack::core::{AppError, AppResult};
use invitrack::invites::GroupGateway;
use invitrack::report::{AccessTokenProvider, AttributionEvent, ReportError, ReportSink};
use invitrack::storage::{InviteRecord, LinkStore, SqliteLinkStore, create_pool};

/// SQLite store in a temp dir; keep the dir alive for the test's duration
pub fn temp_store() -> (TempDir, Arc<SqliteLinkStore>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.db");
    let pool = create_pool(path.to_str().unwrap()).unwrap();
    (dir, Arc::new(SqliteLinkStore::new(pool)))
}

/// Handles for a link creation parked by [`FakeGateway::hold_link`]
#[derive(Clone, Default)]
pub struct HeldLink {
    /// Notified once the creation call is parked
    pub entered: Arc<Notify>,
    /// Notify to let the creation call finish
    pub release: Arc<Notify>,
}

/// In-memory stand-in for the Telegram group
#[derive(Default)]
pub struct FakeGateway {
    counter: AtomicUsize,
    fail_links: AtomicBool,
    fail_approvals: AtomicBool,
    pub created: Mutex<Vec<String>>,
    pub approved: Mutex<Vec<(i64, i64)>>,
    held: Mutex<Option<(String, HeldLink)>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_link_creation(&self) {
        self.fail_links.store(true, Ordering::SeqCst);
    }

    pub fn fail_approvals(&self) {
        self.fail_approvals.store(true, Ordering::SeqCst);
    }

    /// Park creation of the named link until `release` is notified
    pub fn hold_link(&self, name: &str) -> HeldLink {
        let held = HeldLink::default();
        *self.held.lock() = Some((name.to_string(), held.clone()));
        held
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn approvals(&self) -> Vec<(i64, i64)> {
        self.approved.lock().clone()
    }
}

#[async_trait]
impl GroupGateway for FakeGateway {
    async fn create_join_request_link(&self, name: &str) -> AppResult<String> {
        if self.fail_links.load(Ordering::SeqCst) {
            return Err(AppError::Validation("Bad Request: not enough rights".to_string()));
        }
        let held = match &*self.held.lock() {
            Some((held_name, held)) if held_name == name => Some(held.clone()),
            _ => None,
        };
        if let Some(held) = held {
            held.entered.notify_one();
            held.release.notified().await;
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.created.lock().push(name.to_string());
        Ok(format!("https://t.me/+fake{}", n))
    }

    async fn approve_join_request(&self, chat_id: i64, user_id: i64) -> AppResult<()> {
        if self.fail_approvals.load(Ordering::SeqCst) {
            return Err(AppError::Validation("Bad Request: HIDE_REQUESTER_MISSING".to_string()));
        }
        self.approved.lock().push((chat_id, user_id));
        Ok(())
    }
}

/// Link store whose every call fails, as with a locked or corrupt database
pub struct BrokenStore;

fn broken() -> AppError {
    AppError::Database(rusqlite::Error::InvalidQuery)
}

#[async_trait]
impl LinkStore for BrokenStore {
    async fn get(&self, _inviter_id: i64) -> AppResult<Option<InviteRecord>> {
        Err(broken())
    }

    async fn find_by_link(&self, _link: &str) -> AppResult<Option<InviteRecord>> {
        Err(broken())
    }

    async fn put(&self, _record: &InviteRecord) -> AppResult<()> {
        Err(broken())
    }

    async fn list(&self) -> AppResult<Vec<InviteRecord>> {
        Err(broken())
    }
}

/// Report sink that keeps what it was given, or fails on demand
#[derive(Default)]
pub struct RecordingSink {
    failing: AtomicBool,
    pub events: Mutex<Vec<AttributionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    pub fn events(&self) -> Vec<AttributionEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn append(&self, event: &AttributionEvent) -> Result<(), ReportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReportError::Status {
                status: 503,
                body: "The service is currently unavailable.".to_string(),
            });
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Token provider that always hands out the same bearer token
pub struct StaticToken(pub &'static str);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, ReportError> {
        Ok(self.0.to_string())
    }
}
