//! In-memory document replica implementing [`DocStore`].
//!
//! `Doc` is a cheap-clone handle over shared state, so the database
//! controller, the drag handle, and the search view can all hold the same
//! replica.
//!
//! # Concurrency Model
//!
//! - parking_lot locks for state, history, and observers
//! - no lock is held while observers run or events are broadcast, so an
//!   observer may itself read the document or open a new transaction
//! - transactions must not call back into the `Doc` handle; all reads and
//!   writes go through the [`DocTransaction`] they are given
//!
//! Rollback restores a full pre-transaction snapshot. That is O(document)
//! per transaction, which is fine for a local replica of one page.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use folio_types::{BlockId, Flavour, StoreConfig, generate_id};

use crate::block::{Block, MAX_TREE_DEPTH};
use crate::event::{DocEvent, ObserverId};
use crate::store::{DocStore, DocTransaction, Observer};
use crate::value::{Value, ValueMap};
use crate::{CrdtError, Result};

/// Snapshot-able document state.
#[derive(Clone, Debug, Default)]
struct DocState {
    blocks: IndexMap<BlockId, Block>,
    root: Option<BlockId>,
    /// Bumped on every committed change.
    version: u64,
}

impl DocState {
    fn is_ancestor(&self, ancestor: &BlockId, id: &BlockId) -> bool {
        let mut current = self.blocks.get(id).and_then(|b| b.parent.clone());
        let mut depth = 0;
        while let Some(pid) = current {
            if &pid == ancestor {
                return true;
            }
            depth += 1;
            if depth >= MAX_TREE_DEPTH {
                tracing::warn!("is_ancestor() hit MAX_TREE_DEPTH ({MAX_TREE_DEPTH}), truncating");
                return false;
            }
            current = self.blocks.get(&pid).and_then(|b| b.parent.clone());
        }
        false
    }

    fn subtree(&self, id: &BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(block) = self.blocks.get(&next) {
                stack.extend(block.children.iter().rev().cloned());
            }
            out.push(next);
        }
        out
    }
}

#[derive(Default)]
struct History {
    undo: VecDeque<DocState>,
    redo: Vec<DocState>,
}

/// Walk `keys` through nested maps.
fn resolve_map_mut<'m>(mut map: &'m mut ValueMap, keys: &[&str]) -> Option<&'m mut ValueMap> {
    for key in keys {
        map = map.get_mut(*key)?.as_map_mut()?;
    }
    Some(map)
}

fn owned_path(id: &BlockId, path: &[&str]) -> Vec<String> {
    std::iter::once(id.to_string())
        .chain(path.iter().map(|s| s.to_string()))
        .collect()
}

// ============================================================================
// Transaction
// ============================================================================

/// Write access to the document for the duration of one `transact` call.
pub struct Transaction<'a> {
    state: &'a mut DocState,
    touched: Vec<Vec<String>>,
}

impl<'a> Transaction<'a> {
    fn new(state: &'a mut DocState) -> Self {
        Self {
            state,
            touched: Vec::new(),
        }
    }

    fn record(&mut self, id: &BlockId, path: &[&str]) {
        self.touched.push(owned_path(id, path));
    }

    fn into_touched(self) -> Vec<Vec<String>> {
        self.touched
    }

    fn not_a_map(id: &BlockId, path: &[&str]) -> CrdtError {
        CrdtError::NotAMap {
            block: id.clone(),
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DocTransaction for Transaction<'_> {
    fn generate_id(&self) -> String {
        generate_id()
    }

    fn block(&self, id: &BlockId) -> Option<&Block> {
        self.state.blocks.get(id)
    }

    fn get(&self, id: &BlockId, path: &[&str]) -> Option<&Value> {
        self.state.blocks.get(id)?.get(path)
    }

    fn set(&mut self, id: &BlockId, path: &[&str], value: Value) -> Result<()> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| CrdtError::EmptyPath(id.clone()))?;
        let block = self
            .state
            .blocks
            .get_mut(id)
            .ok_or_else(|| CrdtError::BlockNotFound(id.clone()))?;
        let map = resolve_map_mut(&mut block.props, parents)
            .ok_or_else(|| Self::not_a_map(id, parents))?;
        map.insert(last.to_string(), value);
        self.record(id, path);
        Ok(())
    }

    fn ensure_map(&mut self, id: &BlockId, path: &[&str]) -> Result<()> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| CrdtError::EmptyPath(id.clone()))?;
        let block = self
            .state
            .blocks
            .get_mut(id)
            .ok_or_else(|| CrdtError::BlockNotFound(id.clone()))?;
        let map = resolve_map_mut(&mut block.props, parents)
            .ok_or_else(|| Self::not_a_map(id, parents))?;
        match map.get(*last) {
            Some(Value::Map(_)) => Ok(()),
            Some(Value::Null) | None => {
                map.insert(last.to_string(), Value::map());
                self.record(id, path);
                Ok(())
            }
            Some(_) => Err(Self::not_a_map(id, path)),
        }
    }

    fn remove(&mut self, id: &BlockId, path: &[&str]) -> Result<Option<Value>> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| CrdtError::EmptyPath(id.clone()))?;
        let block = self
            .state
            .blocks
            .get_mut(id)
            .ok_or_else(|| CrdtError::BlockNotFound(id.clone()))?;
        let Some(map) = resolve_map_mut(&mut block.props, parents) else {
            return Ok(None);
        };
        let removed = map.shift_remove(*last);
        if removed.is_some() {
            self.record(id, path);
        }
        Ok(removed)
    }

    fn add_block(
        &mut self,
        flavour: Flavour,
        props: ValueMap,
        parent: Option<&BlockId>,
        index: Option<usize>,
    ) -> Result<BlockId> {
        let id = BlockId::from(generate_id());
        match parent {
            None => {
                if let Some(root) = &self.state.root {
                    return Err(CrdtError::RootExists(root.clone()));
                }
                self.state.root = Some(id.clone());
            }
            Some(pid) => {
                let parent_block = self
                    .state
                    .blocks
                    .get_mut(pid)
                    .ok_or_else(|| CrdtError::InvalidReference(pid.clone()))?;
                let at = index
                    .unwrap_or(parent_block.children.len())
                    .min(parent_block.children.len());
                parent_block.children.insert(at, id.clone());
                self.record(pid, &["children"]);
            }
        }

        self.state.blocks.insert(
            id.clone(),
            Block::new(id.clone(), flavour, parent.cloned(), props),
        );
        self.record(&id, &[]);
        tracing::trace!(block = %id, %flavour, "block added");
        Ok(id)
    }

    fn delete_block(&mut self, id: &BlockId) -> Result<()> {
        let block = self
            .state
            .blocks
            .get(id)
            .ok_or_else(|| CrdtError::BlockNotFound(id.clone()))?;
        let Some(parent) = block.parent.clone() else {
            return Err(CrdtError::RootImmutable(id.clone()));
        };

        if let Some(parent_block) = self.state.blocks.get_mut(&parent) {
            parent_block.children.retain(|c| c != id);
        }
        self.record(&parent, &["children"]);

        for doomed in self.state.subtree(id) {
            self.state.blocks.shift_remove(&doomed);
            self.record(&doomed, &[]);
        }
        Ok(())
    }

    fn move_blocks(
        &mut self,
        ids: &[BlockId],
        parent: &BlockId,
        sibling: Option<&BlockId>,
        insert_before: bool,
    ) -> Result<()> {
        if !self.state.blocks.contains_key(parent) {
            return Err(CrdtError::InvalidReference(parent.clone()));
        }
        for id in ids {
            let block = self
                .state
                .blocks
                .get(id)
                .ok_or_else(|| CrdtError::BlockNotFound(id.clone()))?;
            if block.is_root() {
                return Err(CrdtError::RootImmutable(id.clone()));
            }
            if id == parent || self.state.is_ancestor(id, parent) {
                return Err(CrdtError::CyclicMove {
                    block: id.clone(),
                    parent: parent.clone(),
                });
            }
        }
        if let Some(sib) = sibling {
            let valid = !ids.contains(sib)
                && self
                    .state
                    .blocks
                    .get(sib)
                    .is_some_and(|b| b.parent.as_ref() == Some(parent));
            if !valid {
                return Err(CrdtError::InvalidReference(sib.clone()));
            }
        }

        // Detach from old parents.
        for id in ids {
            let old_parent = self.state.blocks.get(id).and_then(|b| b.parent.clone());
            if let Some(old) = old_parent {
                if let Some(old_block) = self.state.blocks.get_mut(&old) {
                    old_block.children.retain(|c| c != id);
                }
                self.record(&old, &["children"]);
            }
        }

        // Attach at the target position, preserving the given order.
        let parent_block = self
            .state
            .blocks
            .get_mut(parent)
            .ok_or_else(|| CrdtError::InvalidReference(parent.clone()))?;
        let mut at = match sibling {
            Some(sib) => {
                let pos = parent_block
                    .children
                    .iter()
                    .position(|c| c == sib)
                    .ok_or_else(|| CrdtError::InvalidReference(sib.clone()))?;
                if insert_before { pos } else { pos + 1 }
            }
            None => parent_block.children.len(),
        };
        for id in ids {
            parent_block.children.insert(at, id.clone());
            at += 1;
        }
        for id in ids {
            if let Some(block) = self.state.blocks.get_mut(id) {
                block.parent = Some(parent.clone());
            }
        }
        self.record(parent, &["children"]);
        tracing::debug!(count = ids.len(), parent = %parent, "blocks moved");
        Ok(())
    }
}

// ============================================================================
// Doc
// ============================================================================

struct DocInner {
    state: Mutex<DocState>,
    history: Mutex<History>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn Fn(&DocEvent) + Send + Sync>)>>,
    next_observer: AtomicU64,
    events: broadcast::Sender<DocEvent>,
    config: StoreConfig,
}

/// Shared handle to one local document replica.
#[derive(Clone)]
pub struct Doc {
    inner: Arc<DocInner>,
}

impl Doc {
    /// Create an empty document.
    pub fn new(config: StoreConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(DocInner {
                state: Mutex::new(DocState::default()),
                history: Mutex::new(History::default()),
                observers: Mutex::new(Vec::new()),
                next_observer: AtomicU64::new(0),
                events,
                config,
            }),
        }
    }

    /// Create a document with a page root block.
    pub fn with_page(config: StoreConfig) -> Result<(Self, BlockId)> {
        let doc = Self::new(config);
        let root = doc.add_block(Flavour::Page, ValueMap::new(), None, None)?;
        Ok((doc, root))
    }

    /// Store version (bumped on every committed change).
    pub fn version(&self) -> u64 {
        self.inner.state.lock().version
    }

    /// Number of blocks, root included.
    pub fn block_count(&self) -> usize {
        self.inner.state.lock().blocks.len()
    }

    /// Add a block in a transaction of its own.
    pub fn add_block(
        &self,
        flavour: Flavour,
        props: ValueMap,
        parent: Option<&BlockId>,
        index: Option<usize>,
    ) -> Result<BlockId> {
        self.transact(|tx| tx.add_block(flavour, props, parent, index))
    }

    /// Delete a block subtree in a transaction of its own.
    pub fn delete_block(&self, id: &BlockId) -> Result<()> {
        self.transact(|tx| tx.delete_block(id))
    }

    /// Set one property in a transaction of its own.
    pub fn set_prop(&self, id: &BlockId, path: &[&str], value: Value) -> Result<()> {
        self.transact(|tx| tx.set(id, path, value))
    }

    pub fn can_undo(&self) -> bool {
        !self.inner.history.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.inner.history.lock().redo.is_empty()
    }

    /// Restore the most recent checkpoint. Returns false when there is none.
    pub fn undo(&self) -> bool {
        let restored = {
            let mut history = self.inner.history.lock();
            let Some(checkpoint) = history.undo.pop_back() else {
                return false;
            };
            let mut state = self.inner.state.lock();
            let current = std::mem::replace(&mut *state, checkpoint);
            state.version = current.version + 1;
            history.redo.push(current);
            state.version
        };
        tracing::debug!(version = restored, "undo");
        self.emit(DocEvent::reset());
        true
    }

    /// Re-apply the most recently undone state. Returns false when there is none.
    pub fn redo(&self) -> bool {
        let restored = {
            let mut history = self.inner.history.lock();
            let Some(next) = history.redo.pop() else {
                return false;
            };
            let mut state = self.inner.state.lock();
            let current = std::mem::replace(&mut *state, next);
            state.version = current.version + 1;
            history.undo.push_back(current);
            state.version
        };
        tracing::debug!(version = restored, "redo");
        self.emit(DocEvent::reset());
        true
    }

    fn emit(&self, event: DocEvent) {
        let observers: Vec<_> = self
            .inner
            .observers
            .lock()
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for observer in observers {
            observer(&event);
        }
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }
}

impl Default for Doc {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl fmt::Debug for Doc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Doc")
            .field("blocks", &state.blocks.len())
            .field("root", &state.root)
            .field("version", &state.version)
            .finish()
    }
}

impl DocStore for Doc {
    fn transact<R, E, F>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut dyn DocTransaction) -> std::result::Result<R, E>,
    {
        let (result, touched) = {
            let mut state = self.inner.state.lock();
            let checkpoint = state.clone();
            let mut tx = Transaction::new(&mut state);
            let result = f(&mut tx);
            let touched = tx.into_touched();
            if result.is_err() {
                *state = checkpoint;
            } else if !touched.is_empty() {
                state.version += 1;
            }
            (result, touched)
        };

        match result {
            Ok(value) => {
                if !touched.is_empty() {
                    let paths: IndexSet<Vec<String>> = touched.into_iter().collect();
                    tracing::debug!(paths = paths.len(), "transaction committed");
                    self.emit(DocEvent {
                        paths: paths.into_iter().collect(),
                    });
                }
                Ok(value)
            }
            Err(e) => {
                tracing::debug!("transaction rolled back");
                Err(e)
            }
        }
    }

    fn generate_id(&self) -> String {
        generate_id()
    }

    fn root(&self) -> Option<BlockId> {
        self.inner.state.lock().root.clone()
    }

    fn block(&self, id: &BlockId) -> Option<Block> {
        self.inner.state.lock().blocks.get(id).cloned()
    }

    fn get_parent(&self, id: &BlockId) -> Option<BlockId> {
        self.inner
            .state
            .lock()
            .blocks
            .get(id)
            .and_then(|b| b.parent.clone())
    }

    fn children(&self, id: &BlockId) -> Vec<BlockId> {
        self.inner
            .state
            .lock()
            .blocks
            .get(id)
            .map(|b| b.children.clone())
            .unwrap_or_default()
    }

    fn prop(&self, id: &BlockId, path: &[&str]) -> Option<Value> {
        self.inner.state.lock().blocks.get(id)?.get(path).cloned()
    }

    fn capture_sync(&self) {
        let snapshot = self.inner.state.lock().clone();
        let mut history = self.inner.history.lock();
        history.undo.push_back(snapshot);
        while history.undo.len() > self.inner.config.undo_limit {
            history.undo.pop_front();
        }
        history.redo.clear();
        tracing::trace!(depth = history.undo.len(), "undo checkpoint captured");
    }

    fn observe(&self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.inner.next_observer.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .lock()
            .push((id, Arc::from(observer)));
        id
    }

    fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
        self.inner.events.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
