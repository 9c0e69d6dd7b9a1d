//! Typed identifiers for blocks and database columns.
//!
//! The shared document keys everything by plain strings (map keys, event path
//! segments), so both ID types wrap a `String`. Fresh IDs are UUIDv7 rendered
//! as 32 hex chars: time-ordered, globally unique, no coordination needed.
//! The `short()` form is for logs and human-facing UI only.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A block identifier (a node in the document tree).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

/// A database column identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

/// Generate a fresh globally-unique id string (UUIDv7, simple hex).
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().as_simple().to_string()
}

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_string_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID.
            pub fn new() -> Self {
                Self(generate_id())
            }

            /// The raw key string, as stored in the document.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Leading 8 characters, for display only.
            pub fn short(&self) -> &str {
                let end = self
                    .0
                    .char_indices()
                    .nth(8)
                    .map(|(i, _)| i)
                    .unwrap_or(self.0.len());
                &self.0[..end]
            }

            /// Consume into the owned key string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<$T> for String {
            fn from(id: $T) -> String {
                id.0
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $T {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_string_id!(BlockId, "BlockId");
impl_string_id!(ColumnId, "ColumnId");
