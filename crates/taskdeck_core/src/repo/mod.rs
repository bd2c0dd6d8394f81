//! Key-value persistence backends.
//!
//! # Responsibility
//! - Define the storage contract the catalog store writes through.
//! - Isolate SQLite details from store orchestration.
//!
//! # Invariants
//! - A write replaces the full value for its key; there are no partial
//!   updates.

pub mod kv_repo;
