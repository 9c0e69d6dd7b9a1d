//! Drag-and-drop reparenting.
//!
//! A drop either moves the dragged blocks next to (or into) a target block,
//! or, when released over empty canvas, lifts them into a freshly created
//! note at the drop point. Every mutating path takes an undo checkpoint
//! first; every refusal happens before the checkpoint.

use std::str::FromStr;

use indexmap::IndexSet;
use kurbo::Point;
use strum::EnumString;

use folio_crdt::{DocStore, Value, ValueMap};
use folio_types::{BlockId, EdgelessConfig, Flavour};

use crate::geometry::{EdgelessTool, GeometryService, closest_block};
use crate::selection::SelectionService;
use crate::{EdgelessError, Result};

/// Note prop holding `[x, y, w, h]` in canvas coordinates.
pub const PROP_XYWH: &str = "xywh";

/// Where a drop lands relative to its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DropType {
    Before,
    After,
    /// Into a database block, as its last rows.
    Database,
    #[default]
    None,
}

impl DropType {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DropType::Before => "before",
            DropType::After => "after",
            DropType::Database => "database",
            DropType::None => "none",
        }
    }
}

/// One drag gesture at the moment of release.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub dragged: Vec<BlockId>,
    pub point: Point,
    pub target: Option<BlockId>,
    pub drop_type: DropType,
}

impl DragSession {
    /// Drop over empty canvas.
    pub fn new(dragged: Vec<BlockId>, point: Point) -> Self {
        Self {
            dragged,
            point,
            target: None,
            drop_type: DropType::None,
        }
    }

    pub fn with_target(mut self, target: BlockId, drop_type: DropType) -> Self {
        self.target = Some(target);
        self.drop_type = drop_type;
        self
    }
}

/// What a drop did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// Nothing changed.
    Cancelled,
    /// Blocks now live under `parent`.
    Moved {
        parent: BlockId,
        cross_container: bool,
    },
    /// Blocks were wrapped in a new note.
    Lifted { note: BlockId },
}

/// Drop handling for one edgeless surface.
pub struct DragHandle<S, G, F> {
    store: S,
    geometry: G,
    selection: F,
    config: EdgelessConfig,
    tool: EdgelessTool,
}

impl<S, G, F> DragHandle<S, G, F>
where
    S: DocStore,
    G: GeometryService,
    F: SelectionService,
{
    pub fn new(store: S, geometry: G, selection: F, config: EdgelessConfig) -> Self {
        Self {
            store,
            geometry,
            selection,
            config,
            tool: EdgelessTool::Default,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    pub fn selection(&self) -> &F {
        &self.selection
    }

    pub fn tool(&self) -> EdgelessTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: EdgelessTool) {
        self.tool = tool;
    }

    /// Block under the pointer for the current tool.
    pub fn closest_block(&self, point: Point) -> Option<BlockId> {
        closest_block(self.tool, point, &self.geometry)
    }

    /// Apply a drop.
    #[tracing::instrument(skip(self, session), fields(dragged = session.dragged.len(), drop_type = session.drop_type.as_str()))]
    pub fn handle_drop(&self, session: &DragSession) -> Result<DropOutcome> {
        let models = self.top_level(&session.dragged);
        if models.is_empty() {
            tracing::debug!("nothing to drop");
            return Ok(DropOutcome::Cancelled);
        }

        match (&session.target, session.drop_type) {
            (Some(_), DropType::None) => Ok(DropOutcome::Cancelled),
            (Some(target), drop_type) => self.drop_on_target(&models, target, drop_type, session.point),
            (None, _) => self.lift_into_note(&models, session.point),
        }
    }

    /// Movable dragged ids, de-duplicated, minus any whose ancestor is also
    /// dragged. Missing blocks and the document root are dropped.
    fn top_level(&self, dragged: &[BlockId]) -> Vec<BlockId> {
        let present: IndexSet<BlockId> = dragged
            .iter()
            .filter(|id| match self.store.block(id) {
                Some(block) if block.is_root() => {
                    tracing::trace!(block = %id, "root is not movable, ignored");
                    false
                }
                Some(_) => true,
                None => {
                    tracing::trace!(block = %id, "dragged block missing, ignored");
                    false
                }
            })
            .cloned()
            .collect();

        present
            .iter()
            .filter(|id| {
                !self
                    .store
                    .ancestors(id)
                    .iter()
                    .any(|a| present.contains(a))
            })
            .cloned()
            .collect()
    }

    fn drop_on_target(
        &self,
        models: &[BlockId],
        target: &BlockId,
        drop_type: DropType,
        point: Point,
    ) -> Result<DropOutcome> {
        if self.store.block(target).is_none() {
            tracing::error!(target = %target, "drop target not in document");
            return Err(EdgelessError::MissingTarget(target.clone()));
        }

        let contains_target = |m: &BlockId| m == target || self.store.is_ancestor(m, target);
        if models.iter().any(contains_target) {
            tracing::debug!(target = %target, "drop onto own subtree cancelled");
            return Ok(DropOutcome::Cancelled);
        }

        let (parent, sibling, insert_before) = match drop_type {
            DropType::Database => (target.clone(), None, false),
            DropType::Before | DropType::After => {
                let Some(parent) = self.store.get_parent(target) else {
                    tracing::error!(target = %target, "drop target has no parent");
                    return Err(EdgelessError::MissingParent(target.clone()));
                };
                (parent, Some(target), drop_type == DropType::Before)
            }
            DropType::None => return Ok(DropOutcome::Cancelled),
        };

        let source = self
            .store
            .get_parent(&models[0])
            .and_then(|p| self.container_at(&p));
        let destination = self.container_at(&parent);

        self.store.capture_sync();
        self.store
            .move_blocks(models, &parent, sibling, insert_before)?;

        let cross_container = source != destination;
        if cross_container {
            if let Some(container) = &destination {
                self.selection.focus_block(container, &models[0], point);
            }
        }
        tracing::debug!(parent = %parent, count = models.len(), cross_container, "blocks dropped");
        Ok(DropOutcome::Moved {
            parent,
            cross_container,
        })
    }

    fn lift_into_note(&self, models: &[BlockId], point: Point) -> Result<DropOutcome> {
        let first = &models[0];
        let Some(rect) = self.geometry.block_rect(first) else {
            tracing::error!(block = %first, "dragged block has no bounds");
            return Err(EdgelessError::MissingBounds(first.clone()));
        };
        let root = self.store.root().ok_or(EdgelessError::NoRoot)?;

        let padding = self.config.note_padding;
        let width = (rect.width() + padding * 2.0).max(self.config.min_note_width);
        let height = rect.height() + padding * 2.0;
        let mut props = ValueMap::new();
        props.insert(
            PROP_XYWH.into(),
            Value::List(vec![
                Value::Number(point.x),
                Value::Number(point.y),
                Value::Number(width),
                Value::Number(height),
            ]),
        );

        self.store.capture_sync();
        let note = self.store.transact(|tx| {
            let note = tx.add_block(Flavour::Note, props, Some(&root), None)?;
            tx.move_blocks(models, &note, None, false)?;
            Ok::<_, EdgelessError>(note)
        })?;

        self.selection.focus_block(&note, first, point);
        tracing::debug!(note = %note, count = models.len(), "blocks lifted into new note");
        Ok(DropOutcome::Lifted { note })
    }

    /// Nearest note at or above `id`.
    fn container_at(&self, id: &BlockId) -> Option<BlockId> {
        std::iter::once(id.clone())
            .chain(self.store.ancestors(id))
            .find(|b| self.store.flavour(b).is_some_and(|f| f.is_container()))
    }
}

impl<S, G, F> std::fmt::Debug for DragHandle<S, G, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragHandle")
            .field("tool", &self.tool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
