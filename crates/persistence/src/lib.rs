//! Persistence layer for the admin console.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - `PgStore`, the PostgreSQL implementation of the domain store boundary
//! - `MemoryStore`, an in-process store used by tests
//! - Query metrics

pub mod db;
pub mod memory;
pub mod metrics;
pub mod pg_store;
pub mod sql;

pub use memory::{FailureRule, MemoryStore, StoreOp};
pub use pg_store::PgStore;
