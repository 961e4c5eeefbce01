//! SQLite backend for the enerscore measurement store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The trigger-style side effects of the
//! ingestion pipeline (aggregate refresh, alert evaluation) are explicit
//! pipeline stages executed inside the same transaction as the insert.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
