//! Telegram bot integration and handlers

pub mod bot;
pub mod gateway;
pub mod handlers;

// Re-exports for convenience
pub use bot::{Command, create_bot, setup_bot_commands};
pub use gateway::TelegramGateway;
pub use handlers::{HandlerDeps, HandlerError, schema};
