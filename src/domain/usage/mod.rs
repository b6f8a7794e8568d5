//! Usage log domain
//!
//! Append-only per-request records keyed by API key.

mod entity;
mod repository;

pub use entity::{UsageLogEntry, UsageLogEntryId};
pub use repository::UsageLogRepository;
