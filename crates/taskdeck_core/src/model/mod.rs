//! Domain model for projects and their todos.
//!
//! # Responsibility
//! - Define the entities the store manages and their local invariants.
//! - Stay independent of the persisted encoding (see `crate::snapshot`).
//!
//! # Invariants
//! - Every entity is identified by an immutable id.
//! - Deletion removes the entity from its owning collection; there are no
//!   tombstones.

pub mod ids;
pub mod project;
pub mod todo;
