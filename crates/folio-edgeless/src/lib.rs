//! Edgeless canvas core for Folio.
//!
//! The canvas renders notes as free-floating containers; blocks move between
//! them by drag and drop. Layout and focus belong to the rendering layer and
//! come in through [`GeometryService`] and [`SelectionService`], so
//! everything here runs headless against any [`DocStore`](folio_crdt::DocStore).

mod drag;
mod error;
mod geometry;
mod selection;

pub use drag::{DragHandle, DragSession, DropOutcome, DropType, PROP_XYWH};
pub use error::EdgelessError;
pub use geometry::{EdgelessTool, GeometryService, closest_block};
pub use selection::{NoSelection, SelectionService};

/// Result type for edgeless operations.
pub type Result<T> = std::result::Result<T, EdgelessError>;
