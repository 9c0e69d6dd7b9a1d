//! End-to-end drop scenarios against an in-memory document.
//!
//! Layout used throughout:
//!
//! ```text
//! page
//! ├── note_a            (container)
//! │   ├── p1
//! │   │   └── p1_child
//! │   ├── p2
//! │   └── db            (database)
//! │       └── row
//! └── note_b            (container)
//!     └── p3
//! ```

use std::collections::HashMap;

use kurbo::{Point, Rect};
use parking_lot::Mutex;

use folio_crdt::{Doc, DocStore, ValueMap};
use folio_edgeless::{
    DragHandle, DragSession, DropOutcome, DropType, EdgelessError, EdgelessTool, GeometryService,
    SelectionService,
};
use folio_types::{BlockId, EdgelessConfig, Flavour, StoreConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Test doubles
// ============================================================================

/// Containers and blocks at fixed rects; the closest block is the first one
/// whose rect contains the point.
#[derive(Default)]
struct FakeGeometry {
    containers: Vec<(BlockId, Rect)>,
    blocks: HashMap<BlockId, (BlockId, Rect)>,
}

impl FakeGeometry {
    fn container(mut self, id: &BlockId, rect: Rect) -> Self {
        self.containers.push((id.clone(), rect));
        self
    }

    fn block(mut self, id: &BlockId, container: &BlockId, rect: Rect) -> Self {
        self.blocks.insert(id.clone(), (container.clone(), rect));
        self
    }
}

impl GeometryService for FakeGeometry {
    fn hit_test_container(&self, point: Point) -> Option<BlockId> {
        self.containers
            .iter()
            .find(|(_, rect)| rect.contains(point))
            .map(|(id, _)| id.clone())
    }

    fn closest_block_in_container(&self, point: Point, container: &BlockId) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|(_, (owner, rect))| owner == container && rect.contains(point))
            .map(|(id, _)| id.clone())
    }

    fn block_rect(&self, block: &BlockId) -> Option<Rect> {
        self.blocks.get(block).map(|(_, rect)| *rect)
    }
}

#[derive(Default)]
struct RecordingSelection {
    focused: Mutex<Vec<(BlockId, BlockId, Point)>>,
}

impl RecordingSelection {
    fn take(&self) -> Vec<(BlockId, BlockId, Point)> {
        std::mem::take(&mut *self.focused.lock())
    }
}

impl SelectionService for RecordingSelection {
    fn focus_block(&self, container: &BlockId, block: &BlockId, point: Point) {
        self.focused
            .lock()
            .push((container.clone(), block.clone(), point));
    }
}

// ============================================================================
// Fixture
// ============================================================================

struct Canvas {
    doc: Doc,
    page: BlockId,
    note_a: BlockId,
    note_b: BlockId,
    p1: BlockId,
    p1_child: BlockId,
    p2: BlockId,
    p3: BlockId,
    db: BlockId,
    handle: DragHandle<Doc, FakeGeometry, RecordingSelection>,
}

fn add(doc: &Doc, flavour: Flavour, parent: &BlockId) -> BlockId {
    doc.add_block(flavour, ValueMap::new(), Some(parent), None)
        .unwrap()
}

fn canvas() -> Canvas {
    init_tracing();
    let (doc, page) = Doc::with_page(StoreConfig::default()).unwrap();
    let note_a = add(&doc, Flavour::Note, &page);
    let p1 = add(&doc, Flavour::Paragraph, &note_a);
    let p1_child = add(&doc, Flavour::Paragraph, &p1);
    let p2 = add(&doc, Flavour::Paragraph, &note_a);
    let db = add(&doc, Flavour::Database, &note_a);
    add(&doc, Flavour::Paragraph, &db);
    let note_b = add(&doc, Flavour::Note, &page);
    let p3 = add(&doc, Flavour::Paragraph, &note_b);

    let geometry = FakeGeometry::default()
        .container(&note_a, Rect::new(0.0, 0.0, 400.0, 300.0))
        .container(&note_b, Rect::new(600.0, 0.0, 1000.0, 300.0))
        .block(&p1, &note_a, Rect::new(10.0, 10.0, 390.0, 40.0))
        .block(&p2, &note_a, Rect::new(10.0, 50.0, 390.0, 80.0))
        .block(&p3, &note_b, Rect::new(610.0, 10.0, 990.0, 40.0));

    let handle = DragHandle::new(
        doc.clone(),
        geometry,
        RecordingSelection::default(),
        EdgelessConfig::default(),
    );
    Canvas {
        doc,
        page,
        note_a,
        note_b,
        p1,
        p1_child,
        p2,
        p3,
        db,
        handle,
    }
}

// ============================================================================
// Drops onto a target
// ============================================================================

#[test]
fn test_self_drop_is_a_noop() {
    let c = canvas();
    let mut events = c.doc.subscribe();
    let version = c.doc.version();

    let session = DragSession::new(vec![c.p1.clone()], Point::new(20.0, 20.0))
        .with_target(c.p1.clone(), DropType::After);
    assert_eq!(c.handle.handle_drop(&session).unwrap(), DropOutcome::Cancelled);

    // dropping onto its own child is the same gesture
    let session = DragSession::new(vec![c.p1.clone()], Point::new(20.0, 20.0))
        .with_target(c.p1_child.clone(), DropType::Before);
    assert_eq!(c.handle.handle_drop(&session).unwrap(), DropOutcome::Cancelled);

    assert_eq!(c.doc.version(), version);
    assert!(events.try_recv().is_err());
    assert!(!c.doc.can_undo());
}

#[test]
fn test_parent_and_child_dragged_moves_parent_only() {
    let c = canvas();
    let session = DragSession::new(vec![c.p1_child.clone(), c.p1.clone()], Point::new(20.0, 60.0))
        .with_target(c.p2.clone(), DropType::After);

    let outcome = c.handle.handle_drop(&session).unwrap();
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            parent: c.note_a.clone(),
            cross_container: false,
        }
    );
    assert_eq!(c.doc.children(&c.note_a), vec![c.p2.clone(), c.p1.clone(), c.db.clone()]);
    assert_eq!(c.doc.get_parent(&c.p1_child), Some(c.p1.clone()));
    // same container, selection untouched
    assert!(c.handle.selection().take().is_empty());
}

#[test]
fn test_drop_before_target() {
    let c = canvas();
    let session = DragSession::new(vec![c.p2.clone()], Point::new(20.0, 20.0))
        .with_target(c.p1.clone(), DropType::Before);

    c.handle.handle_drop(&session).unwrap();
    assert_eq!(c.doc.children(&c.note_a), vec![c.p2.clone(), c.p1.clone(), c.db.clone()]);
}

#[test]
fn test_cross_container_drop_focuses_first_model() {
    let c = canvas();
    let point = Point::new(620.0, 20.0);
    let session = DragSession::new(vec![c.p1.clone(), c.p2.clone()], point)
        .with_target(c.p3.clone(), DropType::Before);

    let outcome = c.handle.handle_drop(&session).unwrap();
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            parent: c.note_b.clone(),
            cross_container: true,
        }
    );
    assert_eq!(
        c.doc.children(&c.note_b),
        vec![c.p1.clone(), c.p2.clone(), c.p3.clone()]
    );
    assert_eq!(
        c.handle.selection().take(),
        vec![(c.note_b.clone(), c.p1.clone(), point)]
    );
}

#[test]
fn test_database_drop_appends_rows() {
    let c = canvas();
    let session = DragSession::new(vec![c.p3.clone()], Point::new(20.0, 120.0))
        .with_target(c.db.clone(), DropType::Database);

    let outcome = c.handle.handle_drop(&session).unwrap();
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            parent: c.db.clone(),
            cross_container: true,
        }
    );
    let rows = c.doc.children(&c.db);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.last(), Some(&c.p3));
    assert!(c.doc.children(&c.note_b).is_empty());
}

#[test]
fn test_drop_is_undoable() {
    let c = canvas();
    let before = c.doc.children(&c.note_b);
    let session = DragSession::new(vec![c.p1.clone()], Point::new(620.0, 20.0))
        .with_target(c.p3.clone(), DropType::After);
    c.handle.handle_drop(&session).unwrap();
    assert!(c.doc.can_undo());

    assert!(c.doc.undo());
    assert_eq!(c.doc.children(&c.note_b), before);
    assert_eq!(c.doc.get_parent(&c.p1), Some(c.note_a.clone()));
}

#[test]
fn test_missing_target_is_an_error() {
    let c = canvas();
    let ghost = BlockId::from("ghost");
    let session = DragSession::new(vec![c.p1.clone()], Point::ZERO)
        .with_target(ghost.clone(), DropType::Before);

    assert_eq!(
        c.handle.handle_drop(&session).unwrap_err(),
        EdgelessError::MissingTarget(ghost)
    );
    assert_eq!(c.doc.get_parent(&c.p1), Some(c.note_a.clone()));
}

// ============================================================================
// Drops on empty canvas
// ============================================================================

#[test]
fn test_drop_on_canvas_lifts_into_new_note() {
    let c = canvas();
    let point = Point::new(1200.0, 500.0);
    let session = DragSession::new(vec![c.p1.clone(), c.p2.clone()], point);

    let outcome = c.handle.handle_drop(&session).unwrap();
    let DropOutcome::Lifted { note } = outcome else {
        panic!("expected a lift, got {outcome:?}");
    };

    assert_eq!(c.doc.flavour(&note), Some(Flavour::Note));
    assert_eq!(c.doc.get_parent(&note), Some(c.page.clone()));
    assert_eq!(c.doc.children(&note), vec![c.p1.clone(), c.p2.clone()]);
    assert_eq!(c.doc.children(&c.note_a), vec![c.db.clone()]);
    assert_eq!(
        c.handle.selection().take(),
        vec![(note.clone(), c.p1.clone(), point)]
    );

    // p1 is 380 wide, padded by 24 each side
    let xywh = c.doc.prop(&note, &[folio_edgeless::PROP_XYWH]).unwrap();
    let nums: Vec<f64> = xywh
        .as_list()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_f64())
        .collect();
    assert_eq!(nums, vec![1200.0, 500.0, 428.0, 78.0]);
}

#[test]
fn test_lift_is_one_event_and_one_checkpoint() {
    let c = canvas();
    let mut events = c.doc.subscribe();
    let session = DragSession::new(vec![c.p3.clone()], Point::new(1200.0, 500.0));

    c.handle.handle_drop(&session).unwrap();
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());

    assert!(c.doc.undo());
    assert!(!c.doc.can_undo());
    assert_eq!(c.doc.get_parent(&c.p3), Some(c.note_b.clone()));
}

#[test]
fn test_lift_without_bounds_fails_cleanly() {
    let c = canvas();
    // the database block has no rendered rect
    let session = DragSession::new(vec![c.db.clone()], Point::new(1200.0, 500.0));
    assert_eq!(
        c.handle.handle_drop(&session).unwrap_err(),
        EdgelessError::MissingBounds(c.db.clone())
    );
    assert!(!c.doc.can_undo());
}

#[test]
fn test_page_root_cannot_be_lifted() {
    let c = canvas();
    let version = c.doc.version();
    let session = DragSession::new(vec![c.page.clone()], Point::new(1200.0, 500.0));

    assert_eq!(c.handle.handle_drop(&session).unwrap(), DropOutcome::Cancelled);
    assert_eq!(c.doc.version(), version);
    assert!(!c.doc.can_undo());
}

#[test]
fn test_root_dragged_with_child_moves_only_the_child() {
    let c = canvas();
    let session = DragSession::new(vec![c.page.clone(), c.p3.clone()], Point::new(20.0, 60.0))
        .with_target(c.p2.clone(), DropType::After);

    c.handle.handle_drop(&session).unwrap();
    assert_eq!(c.doc.get_parent(&c.p3), Some(c.note_a.clone()));
    assert_eq!(c.doc.root(), Some(c.page.clone()));
}

// ============================================================================
// Hit testing
// ============================================================================

#[test]
fn test_hit_testing_follows_tool_mode() {
    let mut c = canvas();
    let over_p2 = Point::new(30.0, 60.0);
    assert_eq!(c.handle.closest_block(over_p2), Some(c.p2.clone()));
    assert_eq!(c.handle.closest_block(Point::new(500.0, 20.0)), None);

    c.handle.set_tool(EdgelessTool::Pan);
    assert_eq!(c.handle.closest_block(over_p2), None);

    c.handle.set_tool(EdgelessTool::Default);
    assert_eq!(c.handle.closest_block(Point::new(620.0, 20.0)), Some(c.p3.clone()));
}
