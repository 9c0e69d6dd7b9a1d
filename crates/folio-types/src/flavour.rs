//! Block flavours, the type tag distinguishing block kinds.
//!
//! Every block shares the same basic shape (id, parent, children, props); the
//! flavour decides how its props are interpreted. Flavours are persisted as
//! namespaced strings (`"folio:database"`), so renames are a compatibility
//! break.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Block type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
pub enum Flavour {
    /// Document root.
    #[serde(rename = "folio:page")]
    #[strum(serialize = "folio:page")]
    Page,
    /// Edgeless container positioned on the canvas (`xywh` prop).
    #[serde(rename = "folio:note")]
    #[strum(serialize = "folio:note")]
    Note,
    /// Plain text block.
    #[serde(rename = "folio:paragraph")]
    #[strum(serialize = "folio:paragraph")]
    Paragraph,
    /// List item block.
    #[serde(rename = "folio:list")]
    #[strum(serialize = "folio:list")]
    List,
    /// Tabular block: children are rows.
    #[serde(rename = "folio:database")]
    #[strum(serialize = "folio:database")]
    Database,
}

impl Flavour {
    /// Parse from the persisted tag.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Persisted tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavour::Page => "folio:page",
            Flavour::Note => "folio:note",
            Flavour::Paragraph => "folio:paragraph",
            Flavour::List => "folio:list",
            Flavour::Database => "folio:database",
        }
    }

    /// Whether blocks of this flavour are canvas containers.
    ///
    /// Drag-and-drop compares containers to decide whether a move crossed
    /// a container boundary.
    pub fn is_container(&self) -> bool {
        matches!(self, Flavour::Note)
    }
}

impl std::fmt::Display for Flavour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavour_round_trip() {
        for flavour in [
            Flavour::Page,
            Flavour::Note,
            Flavour::Paragraph,
            Flavour::List,
            Flavour::Database,
        ] {
            assert_eq!(Flavour::from_str(flavour.as_str()), Some(flavour));
        }
    }

    #[test]
    fn test_unknown_flavour() {
        assert_eq!(Flavour::from_str("folio:kanban"), None);
        assert_eq!(Flavour::from_str("database"), None);
    }

    #[test]
    fn test_only_notes_are_containers() {
        assert!(Flavour::Note.is_container());
        assert!(!Flavour::Database.is_container());
        assert!(!Flavour::Page.is_container());
    }
}
