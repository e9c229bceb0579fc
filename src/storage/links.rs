//! Persistent inviter → invite link table

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use crate::core::error::AppResult;
use crate::storage::db::{DbPool, get_connection};

/// A personal invite link issued to one inviter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteRecord {
    /// Telegram ID of the user who owns the link
    pub inviter_id: i64,
    /// The `https://t.me/+...` link string
    pub link: String,
}

impl InviteRecord {
    pub fn new(inviter_id: i64, link: impl Into<String>) -> Self {
        Self {
            inviter_id,
            link: link.into(),
        }
    }
}

/// Storage for issued invite links, keyed by inviter
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Record previously issued to `inviter_id`, if any
    async fn get(&self, inviter_id: i64) -> AppResult<Option<InviteRecord>>;

    /// Record owning `link`, if any
    async fn find_by_link(&self, link: &str) -> AppResult<Option<InviteRecord>>;

    /// Insert the record, or overwrite the link of an existing inviter
    ///
    /// Fails if the link already belongs to another inviter.
    async fn put(&self, record: &InviteRecord) -> AppResult<()>;

    /// All records, ordered by inviter
    async fn list(&self) -> AppResult<Vec<InviteRecord>>;
}

/// SQLite-backed [`LinkStore`]
///
/// Every query runs on tokio's blocking pool so callers on the dispatcher
/// never wait on disk I/O.
#[derive(Clone)]
pub struct SqliteLinkStore {
    pool: DbPool,
}

impl SqliteLinkStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_connection(&pool)?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn get(&self, inviter_id: i64) -> AppResult<Option<InviteRecord>> {
        self.with_conn(move |conn| select_by_inviter(conn, inviter_id)).await
    }

    async fn find_by_link(&self, link: &str) -> AppResult<Option<InviteRecord>> {
        let link = link.to_owned();
        self.with_conn(move |conn| select_by_link(conn, &link)).await
    }

    async fn put(&self, record: &InviteRecord) -> AppResult<()> {
        let record = record.clone();
        self.with_conn(move |conn| upsert(conn, &record)).await
    }

    async fn list(&self) -> AppResult<Vec<InviteRecord>> {
        self.with_conn(select_all).await
    }
}

fn select_by_inviter(conn: &Connection, inviter_id: i64) -> AppResult<Option<InviteRecord>> {
    let link: Option<Option<String>> = conn
        .query_row(
            "SELECT link FROM links WHERE inviter_id = ?1",
            params![inviter_id],
            |row| row.get(0),
        )
        .optional()?;

    // A NULL link is a row without a usable link, same as no row
    Ok(link.flatten().map(|link| InviteRecord::new(inviter_id, link)))
}

fn select_by_link(conn: &Connection, link: &str) -> AppResult<Option<InviteRecord>> {
    let inviter_id: Option<i64> = conn
        .query_row("SELECT inviter_id FROM links WHERE link = ?1", params![link], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(inviter_id.map(|inviter_id| InviteRecord::new(inviter_id, link)))
}

fn upsert(conn: &Connection, record: &InviteRecord) -> AppResult<()> {
    conn.execute(
        "INSERT INTO links (inviter_id, link) VALUES (?1, ?2)
         ON CONFLICT(inviter_id) DO UPDATE SET link = excluded.link",
        params![record.inviter_id, record.link],
    )?;
    Ok(())
}

fn select_all(conn: &Connection) -> AppResult<Vec<InviteRecord>> {
    let mut stmt = conn.prepare("SELECT inviter_id, link FROM links WHERE link IS NOT NULL ORDER BY inviter_id")?;
    let rows = stmt.query_map([], |row| Ok(InviteRecord::new(row.get(0)?, row.get::<_, String>(1)?)))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}
