//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate domain entities and persistence into caller-facing APIs.
//! - Keep presentation layers decoupled from storage details.

pub mod preferences;
pub mod todo_store;
