//! Database block for Folio.
//!
//! A database block turns its child blocks into rows of a table with typed
//! columns. Everything the table holds lives in the block's props inside the
//! shared document; [`DatabaseBlock`] is a stateless controller over a
//! [`DocStore`](folio_crdt::DocStore).
//!
//! | Type | Role |
//! |------|------|
//! | [`Column`] / [`ColumnType`] | Typed field definition |
//! | [`Cell`] / [`CellValue`] | One row/column value, tagged by type family |
//! | [`DatabaseBlock`] | Column/cell CRUD and single-transaction bulk operations |
//! | [`Slot`] | Typed per-block change signal |
//! | [`SearchView`] | Search widget state machine and row filter |

mod cell;
mod column;
mod database;
mod error;
mod search;
mod slot;

pub use cell::{Cell, CellValue, SelectTag};
pub use column::{Column, ColumnSpec, ColumnType};
pub use database::{
    DatabaseBlock, PROP_CELLS, PROP_COLUMN_DEFS, PROP_COLUMNS, PROP_TITLE,
    PROP_TITLE_COLUMN_NAME, PROP_TITLE_COLUMN_WIDTH, PropsUpdated, SerializedCells,
};
pub use error::DatabaseError;
pub use search::{SearchEvent, SearchMode, SearchView, filter_rows};
pub use slot::{DEFAULT_SLOT_CAPACITY, Slot, drain};

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
