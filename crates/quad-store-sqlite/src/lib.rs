//! SQLite backend for the Quad facility store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every decide operation runs inside a
//! single rusqlite transaction, which is the system's only concurrency
//! primitive.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
