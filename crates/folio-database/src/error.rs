//! Error types for database block operations.

use thiserror::Error;

use folio_crdt::CrdtError;
use folio_types::{BlockId, ColumnId, Flavour};

use crate::column::ColumnType;

/// Errors that can occur during database block operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatabaseError {
    /// Underlying document operation failed.
    #[error(transparent)]
    Crdt(#[from] CrdtError),

    /// Block not found in document.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Block exists but is not a database block.
    #[error("block {id:?} is a {flavour}, not a database")]
    NotADatabase { id: BlockId, flavour: Flavour },

    /// Column is not part of the display order.
    #[error("unknown column: {0:?}")]
    UnknownColumn(ColumnId),

    /// Numbers must be finite to be stored.
    #[error("non-finite number for column {0:?}")]
    NonFiniteNumber(ColumnId),

    /// Value shape does not fit the column's type.
    #[error("value does not fit {kind} column {column:?}")]
    TypeMismatch { column: ColumnId, kind: ColumnType },
}
