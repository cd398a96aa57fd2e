//! Durable persistence for nodes and jobs.
//!
//! A single [`AnyStore`] implementation backs both deployment shapes named in
//! the coordinator design: an embedded SQLite file for a single-master
//! install, and a networked PostgreSQL database for a multi-master or
//! horizontally-scaled one. Both run through `sqlx::Any` against the same SQL
//! text, so the only thing that differs between them is the DSN passed to
//! [`AnyStore::connect`].

pub mod any_store;
pub mod error;
pub mod schema;

pub use any_store::{AnyStore, Store};
pub use error::{Result, StoreError};
