//! Core types and trait definitions for the Quire collection store.
//!
//! This crate is free of database and runtime dependencies. It owns the
//! permission hierarchy, the audit record shapes and the [`CollectionStore`]
//! contract that storage backends implement.
//!
//! [`CollectionStore`]: store::CollectionStore

// Native `async fn` in traits; the store trait spells out `Send` bounds itself.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod collection;
pub mod document;
pub mod error;
pub mod level;
pub mod store;
pub mod tag;
pub mod user;

pub use error::{Error, Result};
pub use level::{PermissionLevel, satisfies};
