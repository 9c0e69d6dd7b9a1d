//! Change events emitted once per committed transaction.

/// Identifies a registered synchronous observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// All paths touched by one transaction, deduplicated in first-touch order.
///
/// Segment 0 is the block id, segment 1 the property name, deeper segments
/// are nested map keys. An empty path means the whole document changed
/// (undo/redo restore).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocEvent {
    pub paths: Vec<Vec<String>>,
}

impl DocEvent {
    /// Event for a whole-document replacement.
    pub fn reset() -> Self {
        Self {
            paths: vec![Vec::new()],
        }
    }

    /// Whether any change lies under `prefix`, or replaced one of its ancestors.
    pub fn touches(&self, prefix: &[&str]) -> bool {
        self.paths.iter().any(|path| {
            let shared = path.len().min(prefix.len());
            path[..shared]
                .iter()
                .zip(&prefix[..shared])
                .all(|(a, b)| a == b)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(paths: &[&[&str]]) -> DocEvent {
        DocEvent {
            paths: paths
                .iter()
                .map(|p| p.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_touches_descendant_path() {
        let ev = event(&[&["db", "yCells", "row1", "col1"]]);
        assert!(ev.touches(&["db", "yCells"]));
        assert!(!ev.touches(&["db", "yColumns"]));
        assert!(!ev.touches(&["other", "yCells"]));
    }

    #[test]
    fn test_touches_ancestor_replacement() {
        let ev = event(&[&["db"]]);
        assert!(ev.touches(&["db", "yCells"]));
        assert!(DocEvent::reset().touches(&["db", "yColumns"]));
    }
}
