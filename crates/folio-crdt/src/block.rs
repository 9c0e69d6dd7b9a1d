//! Blocks: nodes of the document tree.

use folio_types::{BlockId, Flavour};

use crate::value::{Value, ValueMap};

/// Maximum expected tree depth. Ancestor walks use this as a circuit breaker;
/// exceeding it indicates a cycle or corruption.
pub const MAX_TREE_DEPTH: usize = 512;

/// A block: identity, flavour, position in the tree, and its property bag.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub flavour: Flavour,
    pub parent: Option<BlockId>,
    /// Ordered child ids.
    pub children: Vec<BlockId>,
    pub props: ValueMap,
}

impl Block {
    pub fn new(id: BlockId, flavour: Flavour, parent: Option<BlockId>, props: ValueMap) -> Self {
        Self {
            id,
            flavour,
            parent,
            children: Vec::new(),
            props,
        }
    }

    /// Resolve a property path (`[prop, key, key, ...]`).
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.props.get(*first)?;
        for key in rest {
            current = current.as_map()?.get(*key)?;
        }
        Some(current)
    }

    /// Plain-text content (`text` prop), if any.
    pub fn text(&self) -> Option<&str> {
        self.props.get("text").and_then(Value::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
