//! Selection hook used after a drop lands in another container.

use kurbo::Point;

use folio_types::BlockId;

/// Selection/focus control owned by the surface.
pub trait SelectionService {
    /// Focus `block` inside `container`, placing the caret nearest `point`.
    fn focus_block(&self, container: &BlockId, block: &BlockId, point: Point);
}

/// Selection that ignores every request. For headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSelection;

impl SelectionService for NoSelection {
    fn focus_block(&self, _container: &BlockId, _block: &BlockId, _point: Point) {}
}
