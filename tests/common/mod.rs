//! Common test utilities
//!
//! Fakes for the Telegram group, the report sink, and a throwaway SQLite store.

#![allow(dead_code)]

pub mod fakes;

#[allow(unused_imports)]
pub use fakes::{BrokenStore, FakeGateway, RecordingSink, StaticToken, temp_store};
