//! SQLite backend for the jotter action log.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The synchronous helpers in
//! [`actions`], [`books`] and [`system`] take a plain [`rusqlite::Connection`]
//! (a [`rusqlite::Transaction`] derefs to one), so they compose inside a single
//! unit of work opened with [`SqliteStore::transaction`].

mod encode;
mod schema;
mod store;

pub mod actions;
pub mod books;
pub mod error;
pub mod system;

pub use error::{Error, Result};
pub use store::SqliteStore;
