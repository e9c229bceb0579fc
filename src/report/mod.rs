//! Attribution reporting
//!
//! Every joiner that arrives through a tracked link produces one
//! [`AttributionEvent`]. Events go to a [`ReportSink`] (a Google spreadsheet in
//! production) through [`Reporter`], which never lets a sink failure reach the
//! caller.

pub mod auth;
pub mod sheets;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use thiserror::Error;

pub use auth::{AccessTokenProvider, ServiceAccountAuth, ServiceAccountKey};
pub use sheets::{GoogleEndpoints, GoogleSheetsSink, SpreadsheetRef, SpreadsheetTarget};

/// Timestamp layout written to the report
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to sign token request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("invalid service account credentials: {0}")]
    Credentials(#[from] serde_json::Error),

    #[error("invalid endpoint URL: {0}")]
    Endpoint(String),

    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("spreadsheet {0} has no worksheets")]
    NoWorksheet(String),
}

/// One inviter/joiner pair, stamped with local time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionEvent {
    pub inviter_id: i64,
    pub joiner_id: i64,
    pub timestamp: NaiveDateTime,
}

impl AttributionEvent {
    pub fn new(inviter_id: i64, joiner_id: i64, timestamp: NaiveDateTime) -> Self {
        Self {
            inviter_id,
            joiner_id,
            timestamp,
        }
    }

    pub fn now(inviter_id: i64, joiner_id: i64) -> Self {
        Self::new(inviter_id, joiner_id, Local::now().naive_local())
    }

    /// Row cells in report column order: inviter, joiner, timestamp
    pub fn row(&self) -> [String; 3] {
        [
            self.inviter_id.to_string(),
            self.joiner_id.to_string(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }
}

/// Append-only destination for attribution events
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn append(&self, event: &AttributionEvent) -> Result<(), ReportError>;
}

/// Best-effort front for a [`ReportSink`]
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ReportSink>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self { sink }
    }

    /// Record that `joiner_id` joined through `inviter_id`'s link
    ///
    /// Failures are logged and dropped.
    pub async fn record(&self, inviter_id: i64, joiner_id: i64) {
        self.record_event(&AttributionEvent::now(inviter_id, joiner_id)).await;
    }

    pub async fn record_event(&self, event: &AttributionEvent) {
        match self.sink.append(event).await {
            Ok(()) => log::info!(
                "✅ Saved to Google Sheet: {} invited {}",
                event.inviter_id,
                event.joiner_id
            ),
            Err(e) => log::error!(
                "❌ Failed to save to Google Sheet ({} invited {}): {}",
                event.inviter_id,
                event.joiner_id,
                e
            ),
        }
    }
}
