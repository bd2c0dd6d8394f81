//! Identifier generation for catalog entities.
//!
//! # Responsibility
//! - Produce fresh opaque identifiers for new projects and todos.
//! - Carry persisted identifiers verbatim during rehydration.
//!
//! # Invariants
//! - Project and todo identifiers are separate namespaces and separate types.
//! - An identifier never changes after the owning entity is created.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a project inside one catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

/// Stable identifier of a todo inside its owning project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

macro_rules! opaque_id {
    ($name:ident) => {
        impl $name {
            /// Generates a fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wraps an identifier read back from storage without reshaping it.
            pub fn from_persisted(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from_persisted(value)
            }
        }
    };
}

opaque_id!(ProjectId);
opaque_id!(TodoId);
