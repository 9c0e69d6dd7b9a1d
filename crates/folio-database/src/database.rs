//! The database block controller.
//!
//! Rows are the block's children; columns and cells live in the block's
//! property bag:
//!
//! ```text
//! title             text
//! columns           [columnId, ...]                display order
//! yColumns          { columnId: Column }
//! yCells            { rowId: { columnId: Cell } }
//! titleColumnName   text
//! titleColumnWidth  number
//! ```
//!
//! The controller keeps no copy of any of this. Every read goes to the
//! store, every write is one transaction, and bulk operations cover all rows
//! in a single transaction so observers see one consolidated change.
//!
//! `delete_column` removes only the definition. Cells of a deleted column
//! stay in `yCells` until `delete_cells_by_column` runs; `remove_column`
//! does both (and drops the id from the display order) atomically.

use indexmap::IndexMap;

use folio_crdt::{DocEvent, DocStore, DocTransaction, ObserverId, Value, ValueMap};
use folio_types::{BlockId, ColumnId, DatabaseConfig, Flavour};

use crate::cell::{Cell, CellValue, SelectTag};
use crate::column::{Column, ColumnSpec, ColumnType};
use crate::slot::{DEFAULT_SLOT_CAPACITY, Slot};
use crate::{DatabaseError, Result};

pub const PROP_TITLE: &str = "title";
pub const PROP_COLUMNS: &str = "columns";
pub const PROP_CELLS: &str = "yCells";
pub const PROP_COLUMN_DEFS: &str = "yColumns";
pub const PROP_TITLE_COLUMN_NAME: &str = "titleColumnName";
pub const PROP_TITLE_COLUMN_WIDTH: &str = "titleColumnWidth";

/// Row id → (column id → cell).
pub type SerializedCells = IndexMap<BlockId, IndexMap<ColumnId, Cell>>;

/// Payload of the `props_updated` signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropsUpdated {
    pub block: BlockId,
}

/// Behavioral surface of one database block.
pub struct DatabaseBlock<S: DocStore> {
    store: S,
    id: BlockId,
    config: DatabaseConfig,
    props_updated: Slot<PropsUpdated>,
    observer: Option<ObserverId>,
}

impl<S: DocStore> DatabaseBlock<S> {
    /// Create a new, empty database block under `parent` and attach to it.
    pub fn create(
        store: S,
        parent: &BlockId,
        title: &str,
        config: DatabaseConfig,
    ) -> Result<Self> {
        let mut props = ValueMap::new();
        props.insert(PROP_TITLE.into(), Value::from(title));
        props.insert(PROP_COLUMNS.into(), Value::List(Vec::new()));
        props.insert(PROP_CELLS.into(), Value::map());
        props.insert(PROP_COLUMN_DEFS.into(), Value::map());
        props.insert(
            PROP_TITLE_COLUMN_NAME.into(),
            Value::from(config.title_column_name.as_str()),
        );
        props.insert(
            PROP_TITLE_COLUMN_WIDTH.into(),
            Value::Number(config.title_column_width),
        );

        let id = store.transact(|tx| tx.add_block(Flavour::Database, props, Some(parent), None))?;
        tracing::debug!(block = %id, "database block created");
        Self::attach(store, id, config)
    }

    /// Attach to an existing database block and start forwarding its
    /// column/cell changes to `props_updated`.
    pub fn attach(store: S, id: BlockId, config: DatabaseConfig) -> Result<Self> {
        let flavour = store
            .flavour(&id)
            .ok_or_else(|| DatabaseError::BlockNotFound(id.clone()))?;
        if flavour != Flavour::Database {
            return Err(DatabaseError::NotADatabase { id, flavour });
        }

        let props_updated = Slot::new(DEFAULT_SLOT_CAPACITY);
        let slot = props_updated.clone();
        let watched = id.clone();
        let observer = store.observe(Box::new(move |event: &DocEvent| {
            if touches_table(event, watched.as_str()) {
                slot.emit(PropsUpdated {
                    block: watched.clone(),
                });
            }
        }));

        Ok(Self {
            store,
            id,
            config,
            props_updated,
            observer: Some(observer),
        })
    }

    /// Stop forwarding store events.
    pub fn detach(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(observer) = self.observer.take() {
            self.store.unobserve(observer);
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fires once per store change event touching columns or cells.
    pub fn props_updated(&self) -> &Slot<PropsUpdated> {
        &self.props_updated
    }

    // =========================================================================
    // Block props
    // =========================================================================

    pub fn title(&self) -> String {
        self.text_prop(PROP_TITLE).unwrap_or_default()
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.store
            .transact(|tx| tx.set(&self.id, &[PROP_TITLE], Value::from(title)))?;
        Ok(())
    }

    pub fn title_column_name(&self) -> String {
        self.text_prop(PROP_TITLE_COLUMN_NAME)
            .unwrap_or_else(|| self.config.title_column_name.clone())
    }

    pub fn set_title_column_name(&self, name: &str) -> Result<()> {
        self.store
            .transact(|tx| tx.set(&self.id, &[PROP_TITLE_COLUMN_NAME], Value::from(name)))?;
        Ok(())
    }

    pub fn title_column_width(&self) -> f64 {
        self.store
            .prop(&self.id, &[PROP_TITLE_COLUMN_WIDTH])
            .and_then(|v| v.as_f64())
            .unwrap_or(self.config.title_column_width)
    }

    pub fn set_title_column_width(&self, width: f64) -> Result<()> {
        self.store.transact(|tx| {
            tx.set(&self.id, &[PROP_TITLE_COLUMN_WIDTH], Value::Number(width))
        })?;
        Ok(())
    }

    fn text_prop(&self, key: &str) -> Option<String> {
        self.store
            .prop(&self.id, &[key])
            .and_then(|v| v.as_str().map(str::to_string))
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Row block ids, in document order.
    pub fn rows(&self) -> Vec<BlockId> {
        self.store.children(&self.id)
    }

    /// A row's free-text content.
    pub fn row_title(&self, row: &BlockId) -> Option<String> {
        self.store
            .block(row)
            .and_then(|b| b.text().map(str::to_string))
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub fn get_column(&self, id: &ColumnId) -> Option<Column> {
        let value = self
            .store
            .prop(&self.id, &[PROP_COLUMN_DEFS, id.as_str()])?;
        decode_column(&value, id)
    }

    /// Ids in display order.
    pub fn column_ids(&self) -> Vec<ColumnId> {
        self.store
            .prop(&self.id, &[PROP_COLUMNS])
            .map(|v| column_order(&v))
            .unwrap_or_default()
    }

    /// Column definitions in display order. Ids without a definition are
    /// skipped.
    pub fn columns(&self) -> Vec<Column> {
        self.column_ids()
            .iter()
            .filter_map(|id| self.get_column(id))
            .collect()
    }

    /// Insert or overwrite a column definition. Does not touch the display
    /// order.
    pub fn update_column(&self, spec: ColumnSpec) -> Result<ColumnId> {
        let default_width = self.config.default_column_width;
        let id = self
            .store
            .transact(|tx| write_column(tx, &self.id, spec, default_width))?;
        tracing::debug!(block = %self.id, column = %id, "column updated");
        Ok(id)
    }

    /// Upsert a column and place it in the display order at `index`
    /// (clamped to the end).
    pub fn add_column(&self, spec: ColumnSpec, index: usize) -> Result<ColumnId> {
        let default_width = self.config.default_column_width;
        let id = self.store.transact(|tx| {
            let id = write_column(tx, &self.id, spec, default_width)?;
            let mut order = tx
                .get(&self.id, &[PROP_COLUMNS])
                .map(column_order)
                .unwrap_or_default();
            if !order.contains(&id) {
                order.insert(index.min(order.len()), id.clone());
                tx.set(&self.id, &[PROP_COLUMNS], order_value(&order))?;
            }
            Ok::<_, DatabaseError>(id)
        })?;
        tracing::debug!(block = %self.id, column = %id, index, "column added");
        Ok(id)
    }

    /// Move a column within the display order.
    pub fn move_column(&self, id: &ColumnId, to_index: usize) -> Result<()> {
        self.store.transact(|tx| {
            let mut order = tx
                .get(&self.id, &[PROP_COLUMNS])
                .map(column_order)
                .unwrap_or_default();
            let from = order
                .iter()
                .position(|c| c == id)
                .ok_or_else(|| DatabaseError::UnknownColumn(id.clone()))?;
            let column = order.remove(from);
            order.insert(to_index.min(order.len()), column);
            tx.set(&self.id, &[PROP_COLUMNS], order_value(&order))?;
            Ok(())
        })
    }

    /// Remove a column definition. Cells are left in place.
    pub fn delete_column(&self, id: &ColumnId) -> Result<()> {
        self.store
            .transact(|tx| tx.remove(&self.id, &[PROP_COLUMN_DEFS, id.as_str()]))?;
        tracing::debug!(block = %self.id, column = %id, "column definition deleted");
        Ok(())
    }

    /// Remove a column definition, its display slot, and all of its cells.
    #[tracing::instrument(skip(self), fields(block = %self.id))]
    pub fn remove_column(&self, id: &ColumnId) -> Result<()> {
        let removed = self.store.transact(|tx| {
            tx.remove(&self.id, &[PROP_COLUMN_DEFS, id.as_str()])?;
            let mut order = tx
                .get(&self.id, &[PROP_COLUMNS])
                .map(column_order)
                .unwrap_or_default();
            let before = order.len();
            order.retain(|c| c != id);
            if order.len() != before {
                tx.set(&self.id, &[PROP_COLUMNS], order_value(&order))?;
            }
            remove_column_cells(tx, &self.id, id)
        })?;
        tracing::debug!(cells = removed, "column removed");
        Ok(())
    }

    // =========================================================================
    // Cells
    // =========================================================================

    pub fn get_cell(&self, row: &BlockId, column: &ColumnId) -> Option<Cell> {
        let value = self
            .store
            .prop(&self.id, &[PROP_CELLS, row.as_str(), column.as_str()])?;
        decode_cell(&value, row.as_str(), column)
    }

    /// Replace one cell wholesale, creating the row's container if needed.
    ///
    /// When the column is defined, the value must fit its type.
    pub fn update_cell(&self, row: &BlockId, cell: Cell) -> Result<()> {
        if let Some(column) = self.get_column(&cell.column_id) {
            if !column.kind.accepts(&cell.value) {
                return Err(DatabaseError::TypeMismatch {
                    column: column.id,
                    kind: column.kind,
                });
            }
        }
        self.store
            .transact(|tx| write_cell(tx, &self.id, row.as_str(), &cell))?;
        tracing::trace!(block = %self.id, row = %row, column = %cell.column_id, "cell updated");
        Ok(())
    }

    /// Snapshot of every stored cell, read from the live document.
    pub fn serialized_cells(&self) -> SerializedCells {
        let Some(Value::Map(rows)) = self.store.prop(&self.id, &[PROP_CELLS]) else {
            return SerializedCells::new();
        };
        rows.iter()
            .filter_map(|(row, cells)| {
                let cells = cells.as_map()?;
                let decoded = cells
                    .iter()
                    .filter_map(|(column, value)| {
                        let column = ColumnId::from(column.as_str());
                        decode_cell(value, row, &column).map(|cell| (column, cell))
                    })
                    .collect();
                Some((BlockId::from(row.as_str()), decoded))
            })
            .collect()
    }

    // =========================================================================
    // Bulk column operations
    // =========================================================================

    /// Copy every `from` cell into a new `to` cell. Returns rows written.
    #[tracing::instrument(skip(self), fields(block = %self.id))]
    pub fn copy_cells_by_column(&self, from: &ColumnId, to: &ColumnId) -> Result<usize> {
        let copied = self.store.transact(|tx| {
            let mut copied = 0;
            for row in row_keys(tx, &self.id) {
                let Some(cell) = read_cell(tx, &self.id, &row, from) else {
                    continue;
                };
                write_cell(tx, &self.id, &row, &Cell::new(to.clone(), cell.value))?;
                copied += 1;
            }
            Ok::<_, DatabaseError>(copied)
        })?;
        tracing::debug!(copied, "cells copied");
        Ok(copied)
    }

    /// Delete every cell of `column`. Returns rows touched.
    #[tracing::instrument(skip(self), fields(block = %self.id))]
    pub fn delete_cells_by_column(&self, column: &ColumnId) -> Result<usize> {
        let removed = self
            .store
            .transact(|tx| remove_column_cells(tx, &self.id, column))?;
        tracing::debug!(removed, "cells deleted");
        Ok(removed)
    }

    /// Re-encode every cell of `column` for `new_type`. Returns rows written.
    #[tracing::instrument(skip(self), fields(block = %self.id))]
    pub fn convert_cells_by_column(&self, column: &ColumnId, new_type: ColumnType) -> Result<usize> {
        let converted = self.store.transact(|tx| {
            let mut converted = 0;
            for row in row_keys(tx, &self.id) {
                let Some(cell) = read_cell(tx, &self.id, &row, column) else {
                    continue;
                };
                let Some(value) = cell.value.convert_to(new_type) else {
                    tracing::trace!(row = %row, "cell left unconverted");
                    continue;
                };
                if value != cell.value {
                    write_cell(tx, &self.id, &row, &Cell::new(column.clone(), value))?;
                    converted += 1;
                }
            }
            Ok::<_, DatabaseError>(converted)
        })?;
        tracing::debug!(converted, "cells converted");
        Ok(converted)
    }

    /// Replace `old` with `new` in place in every tag list of `column`.
    /// Rows whose list lacks `old` are untouched.
    #[tracing::instrument(skip(self), fields(block = %self.id))]
    pub fn rename_selected_cell_tag(
        &self,
        column: &ColumnId,
        old: &SelectTag,
        new: &SelectTag,
    ) -> Result<usize> {
        let renamed = self.store.transact(|tx| {
            let mut renamed = 0;
            for row in row_keys(tx, &self.id) {
                let Some(Cell {
                    value: CellValue::Tags(mut tags),
                    ..
                }) = read_cell(tx, &self.id, &row, column)
                else {
                    continue;
                };
                let Some(pos) = tags.iter().position(|t| t.same_tag(old)) else {
                    tracing::trace!(row = %row, tag = %old.value, "tag not present, row skipped");
                    continue;
                };
                tags[pos] = new.clone();
                write_cell(tx, &self.id, &row, &Cell::new(column.clone(), CellValue::Tags(tags)))?;
                renamed += 1;
            }
            Ok::<_, DatabaseError>(renamed)
        })?;
        tracing::debug!(renamed, "tag renamed");
        Ok(renamed)
    }

    /// Remove every tag equal (by value) to `target` from the tag lists of
    /// `column`.
    #[tracing::instrument(skip(self), fields(block = %self.id))]
    pub fn delete_selected_cell_tag(&self, column: &ColumnId, target: &SelectTag) -> Result<usize> {
        let affected = self.store.transact(|tx| {
            let mut affected = 0;
            for row in row_keys(tx, &self.id) {
                let Some(Cell {
                    value: CellValue::Tags(tags),
                    ..
                }) = read_cell(tx, &self.id, &row, column)
                else {
                    continue;
                };
                let kept: Vec<SelectTag> =
                    tags.iter().filter(|t| !t.same_tag(target)).cloned().collect();
                if kept.len() != tags.len() {
                    write_cell(tx, &self.id, &row, &Cell::new(column.clone(), CellValue::Tags(kept)))?;
                    affected += 1;
                }
            }
            Ok::<_, DatabaseError>(affected)
        })?;
        tracing::debug!(affected, "tag deleted");
        Ok(affected)
    }
}

impl<S: DocStore> Drop for DatabaseBlock<S> {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl<S: DocStore> std::fmt::Debug for DatabaseBlock<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseBlock")
            .field("id", &self.id)
            .field("attached", &self.observer.is_some())
            .finish()
    }
}

// ============================================================================
// Transaction helpers
// ============================================================================

fn touches_table(event: &DocEvent, block: &str) -> bool {
    event.touches(&[block, PROP_CELLS])
        || event.touches(&[block, PROP_COLUMN_DEFS])
        || event.touches(&[block, PROP_COLUMNS])
}

fn decode_column(value: &Value, id: &ColumnId) -> Option<Column> {
    match value.deserialize::<Column>() {
        Ok(column) => Some(column),
        Err(e) => {
            tracing::warn!(column = %id, "malformed column definition: {e}");
            None
        }
    }
}

fn decode_cell(value: &Value, row: &str, column: &ColumnId) -> Option<Cell> {
    match value.deserialize::<Cell>() {
        Ok(mut cell) => {
            if cell.column_id != *column {
                tracing::warn!(row, column = %column, stored = %cell.column_id, "cell columnId disagrees with its key");
                cell.column_id = column.clone();
            }
            Some(cell)
        }
        Err(e) => {
            tracing::warn!(row, column = %column, "malformed cell: {e}");
            None
        }
    }
}

fn column_order(value: &Value) -> Vec<ColumnId> {
    value
        .as_list()
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(ColumnId::from)
                .collect()
        })
        .unwrap_or_default()
}

fn order_value(order: &[ColumnId]) -> Value {
    Value::List(order.iter().map(|c| Value::from(c.as_str())).collect())
}

fn write_column(
    tx: &mut dyn DocTransaction,
    block: &BlockId,
    spec: ColumnSpec,
    default_width: f64,
) -> Result<ColumnId> {
    let id = spec
        .id
        .unwrap_or_else(|| ColumnId::from(tx.generate_id()));
    let existing_width = tx
        .get(block, &[PROP_COLUMN_DEFS, id.as_str(), "width"])
        .and_then(Value::as_f64);
    let column = Column {
        id: id.clone(),
        name: spec.name,
        kind: spec.kind,
        width: spec.width.or(existing_width).unwrap_or(default_width),
        options: spec.options,
    };
    tx.ensure_map(block, &[PROP_COLUMN_DEFS])?;
    tx.set(
        block,
        &[PROP_COLUMN_DEFS, id.as_str()],
        Value::from_serialize(&column)?,
    )?;
    Ok(id)
}

fn row_keys(tx: &dyn DocTransaction, block: &BlockId) -> Vec<String> {
    tx.get(block, &[PROP_CELLS])
        .and_then(Value::as_map)
        .map(|rows| rows.keys().cloned().collect())
        .unwrap_or_default()
}

fn read_cell(tx: &dyn DocTransaction, block: &BlockId, row: &str, column: &ColumnId) -> Option<Cell> {
    let value = tx.get(block, &[PROP_CELLS, row, column.as_str()])?;
    decode_cell(value, row, column)
}

/// Write a cell under its own column id, creating containers as needed.
fn write_cell(tx: &mut dyn DocTransaction, block: &BlockId, row: &str, cell: &Cell) -> Result<()> {
    if let CellValue::Number(n) = cell.value {
        if !n.is_finite() {
            return Err(DatabaseError::NonFiniteNumber(cell.column_id.clone()));
        }
    }
    tx.ensure_map(block, &[PROP_CELLS])?;
    tx.ensure_map(block, &[PROP_CELLS, row])?;
    tx.set(
        block,
        &[PROP_CELLS, row, cell.column_id.as_str()],
        Value::from_serialize(cell)?,
    )?;
    Ok(())
}

fn remove_column_cells(tx: &mut dyn DocTransaction, block: &BlockId, column: &ColumnId) -> Result<usize> {
    let mut removed = 0;
    for row in row_keys(tx, block) {
        if tx
            .remove(block, &[PROP_CELLS, row.as_str(), column.as_str()])?
            .is_some()
        {
            removed += 1;
        }
    }
    Ok(removed)
}

// ============================================================================
// Tests
// ============================================================================
