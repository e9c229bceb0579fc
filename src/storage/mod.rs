//! Database pool, migrations, and the invite link table

pub mod db;
pub mod links;
pub mod migrations;

// Re-exports for convenience
pub use db::{DbConnection, DbPool, create_pool, get_connection, open_existing_pool};
pub use links::{InviteRecord, LinkStore, SqliteLinkStore};
