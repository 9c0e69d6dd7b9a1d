//! Error types for edgeless canvas operations.

use thiserror::Error;

use folio_crdt::CrdtError;
use folio_types::BlockId;

/// Errors that abort a drop before anything is mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EdgelessError {
    /// Underlying document operation failed.
    #[error(transparent)]
    Crdt(#[from] CrdtError),

    /// Drop target is not in the document.
    #[error("drop target not found: {0:?}")]
    MissingTarget(BlockId),

    /// Drop target has no parent to insert beside it.
    #[error("drop target has no parent: {0:?}")]
    MissingParent(BlockId),

    /// Geometry has no bounding rect for a dragged block.
    #[error("no bounds for block: {0:?}")]
    MissingBounds(BlockId),

    /// Document has no root to hold a new note.
    #[error("document has no root block")]
    NoRoot,
}
