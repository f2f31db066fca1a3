//! SQLite backend for the Quire collection store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation runs in one
//! `BEGIN IMMEDIATE` transaction, which takes the write lock before the
//! precondition reads and so serialises concurrent writers across
//! connections.

mod audit;
mod encode;
mod permissions;
mod schema;
mod store;
mod tags;

pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
