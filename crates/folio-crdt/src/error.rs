//! Error types for document store operations.

use thiserror::Error;

use folio_types::BlockId;

/// Errors that can occur during document operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrdtError {
    /// Block not found in document.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Invalid reference block (sibling or parent) for insertion or move.
    #[error("reference block not found: {0:?}")]
    InvalidReference(BlockId),

    /// A second parentless block was added.
    #[error("document already has a root block: {0:?}")]
    RootExists(BlockId),

    /// The root block cannot be moved or deleted.
    #[error("operation not supported on the root block {0:?}")]
    RootImmutable(BlockId),

    /// Moving a block under itself or one of its descendants.
    #[error("cannot move block {block:?} under its own subtree at {parent:?}")]
    CyclicMove { block: BlockId, parent: BlockId },

    /// A path segment resolved to something other than a nested map.
    #[error("property path {path:?} on block {block:?} is not a map")]
    NotAMap { block: BlockId, path: Vec<String> },

    /// Empty property path where a key was required.
    #[error("empty property path on block {0:?}")]
    EmptyPath(BlockId),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
