//! The document store interface the editor core depends on.
//!
//! Any replicated map/tree engine can sit behind these two traits. The core
//! never names a concrete store type; it is generic over [`DocStore`] and
//! mutates only through the [`DocTransaction`] handed to `transact`.

use tokio::sync::broadcast;

use folio_types::{BlockId, Flavour};

use crate::block::{Block, MAX_TREE_DEPTH};
use crate::event::{DocEvent, ObserverId};
use crate::value::{Value, ValueMap};
use crate::Result;

/// Synchronous change observer.
pub type Observer = Box<dyn Fn(&DocEvent) + Send + Sync>;

/// Mutation surface available inside one transaction.
///
/// Every write records its path; the store emits all recorded paths as one
/// [`DocEvent`] when the transaction commits.
pub trait DocTransaction {
    /// Fresh globally-unique id.
    fn generate_id(&self) -> String;

    fn block(&self, id: &BlockId) -> Option<&Block>;

    /// Resolve `[prop, key, ...]` on a block.
    fn get(&self, id: &BlockId, path: &[&str]) -> Option<&Value>;

    /// Write `value` at `path`. Every segment but the last must already
    /// resolve to a map.
    fn set(&mut self, id: &BlockId, path: &[&str], value: Value) -> Result<()>;

    /// Create an empty map at `path` if nothing is there yet.
    fn ensure_map(&mut self, id: &BlockId, path: &[&str]) -> Result<()>;

    /// Remove the entry at `path`, returning it.
    fn remove(&mut self, id: &BlockId, path: &[&str]) -> Result<Option<Value>>;

    /// Add a block under `parent` at `index` (append when `None`).
    /// A `None` parent creates the document root.
    fn add_block(
        &mut self,
        flavour: Flavour,
        props: ValueMap,
        parent: Option<&BlockId>,
        index: Option<usize>,
    ) -> Result<BlockId>;

    /// Delete a block and its whole subtree.
    fn delete_block(&mut self, id: &BlockId) -> Result<()>;

    /// Re-parent `ids` (keeping their relative order) under `parent`, placed
    /// before or after `sibling`, or appended when there is no sibling.
    fn move_blocks(
        &mut self,
        ids: &[BlockId],
        parent: &BlockId,
        sibling: Option<&BlockId>,
        insert_before: bool,
    ) -> Result<()>;
}

/// A shared, transactional block tree with change notification.
pub trait DocStore {
    /// Run `f` atomically. On `Err` every write is rolled back and nothing is
    /// emitted; on `Ok` observers see exactly one event (if anything changed).
    fn transact<R, E, F>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut dyn DocTransaction) -> std::result::Result<R, E>;

    /// Fresh globally-unique id.
    fn generate_id(&self) -> String;

    /// The document root block.
    fn root(&self) -> Option<BlockId>;

    /// Owned copy of a block.
    fn block(&self, id: &BlockId) -> Option<Block>;

    fn get_parent(&self, id: &BlockId) -> Option<BlockId>;

    fn children(&self, id: &BlockId) -> Vec<BlockId>;

    /// Owned copy of the value at `[prop, key, ...]`.
    fn prop(&self, id: &BlockId, path: &[&str]) -> Option<Value>;

    /// Synchronous undo checkpoint of the current state.
    fn capture_sync(&self);

    /// Register a callback run after every committed transaction.
    fn observe(&self, observer: Observer) -> ObserverId;

    /// Remove an observer. Returns whether it was registered.
    fn unobserve(&self, id: ObserverId) -> bool;

    /// Channel receiving every committed event.
    fn subscribe(&self) -> broadcast::Receiver<DocEvent>;

    fn flavour(&self, id: &BlockId) -> Option<Flavour> {
        self.block(id).map(|b| b.flavour)
    }

    /// Re-parent blocks in a transaction of their own.
    fn move_blocks(
        &self,
        ids: &[BlockId],
        parent: &BlockId,
        sibling: Option<&BlockId>,
        insert_before: bool,
    ) -> Result<()> {
        self.transact(|tx| tx.move_blocks(ids, parent, sibling, insert_before))
    }

    /// Walk up the parent chain (nearest first).
    fn ancestors(&self, id: &BlockId) -> Vec<BlockId> {
        let mut ancestors = Vec::new();
        let mut current = self.get_parent(id);
        while let Some(pid) = current {
            if ancestors.len() >= MAX_TREE_DEPTH {
                tracing::warn!("ancestors() hit MAX_TREE_DEPTH ({MAX_TREE_DEPTH}), truncating");
                break;
            }
            current = self.get_parent(&pid);
            ancestors.push(pid);
        }
        ancestors
    }

    /// Whether `ancestor` lies strictly above `id`.
    fn is_ancestor(&self, ancestor: &BlockId, id: &BlockId) -> bool {
        self.ancestors(id).iter().any(|a| a == ancestor)
    }
}
