//! Invitrack - Telegram group invite tracker
//!
//! Issues a personal join-request invite link to every member who asks for
//! one, approves join requests, and reports which member brought each new
//! joiner to a Google spreadsheet.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, and the liveness endpoint
//! - `storage`: SQLite pool, migrations, and the invite link table
//! - `invites`: invite issuing and join attribution
//! - `report`: attribution events and the Google Sheets sink
//! - `telegram`: bot construction, gateway, and dispatcher schema

pub mod cli;
pub mod core;
pub mod invites;
pub mod report;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{AppError, AppResult, Config};
pub use invites::{InviteIssuer, JoinApprover};
pub use storage::{InviteRecord, LinkStore, SqliteLinkStore, create_pool};
