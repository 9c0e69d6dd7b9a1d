//! Shared block document store for Folio.
//!
//! The editor core treats the replicated document as a black box behind
//! [`DocStore`]: a tree of blocks, each with a flavour and a nested property
//! bag, mutated only inside atomic transactions and observed through
//! path-scoped change events.
//!
//! # Semantics
//!
//! - **Transactions**: all writes inside one `transact` call commit together
//!   or roll back together. Observers never see intermediate state.
//! - **Events**: one [`DocEvent`] per committed transaction, carrying every
//!   touched path (`[block_id, prop, key, ...]`).
//! - **Undo**: `capture_sync` records a checkpoint synchronously; callers
//!   take it immediately before the mutation it should undo.
//!
//! [`Doc`] is the in-memory replica used by the editor and its tests.

mod block;
mod doc;
mod error;
mod event;
mod store;
mod value;

pub use block::{Block, MAX_TREE_DEPTH};
pub use doc::{Doc, Transaction};
pub use error::CrdtError;
pub use event::{DocEvent, ObserverId};
pub use store::{DocStore, DocTransaction, Observer};
pub use value::{Value, ValueMap};

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, CrdtError>;
