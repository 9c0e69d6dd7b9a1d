//! Search/filter state for a database view.
//!
//! ```text
//!  SearchIcon ──ClickIcon──▶ SearchInput ──Input(text)──▶ Searching
//!      ▲                        │   ▲                        │
//!      └──Escape(empty)/────────┘   └──Input("")/Escape──────┘
//!         ClickOutside
//!
//!  any ──ToggleAction──▶ Action ──ToggleAction──▶ (previous mode)
//! ```
//!
//! The filter is recomputed from the live table whenever the query changes,
//! and again on `refresh` after the block's `props_updated` fires.

use folio_crdt::DocStore;
use folio_types::BlockId;

use crate::database::DatabaseBlock;

/// Which part of the search widget is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchMode {
    #[default]
    SearchIcon,
    SearchInput,
    Searching,
    Action,
}

/// User input to the search widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchEvent {
    ClickIcon,
    Input(String),
    Escape,
    ClickOutside,
    ToggleAction,
}

#[derive(Clone, Debug, Default)]
pub struct SearchView {
    mode: SearchMode,
    previous: Option<SearchMode>,
    query: String,
    filtered: Option<Vec<BlockId>>,
}

impl SearchView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Matching row ids, or `None` when no filter is active.
    pub fn filtered(&self) -> Option<&[BlockId]> {
        self.filtered.as_deref()
    }

    /// Apply one input and return the resulting mode.
    pub fn handle<S: DocStore>(&mut self, event: SearchEvent, db: &DatabaseBlock<S>) -> SearchMode {
        use SearchEvent::*;
        use SearchMode::*;

        let before = self.mode;
        match (self.mode, event) {
            (Action, ToggleAction) => {
                self.mode = self.previous.take().unwrap_or_default();
            }
            (mode, ToggleAction) => {
                self.previous = Some(mode);
                self.mode = Action;
            }
            (Action, _) => {}

            (SearchIcon, ClickIcon) => {
                self.query.clear();
                self.filtered = None;
                self.mode = SearchInput;
            }

            (SearchInput | Searching, Input(text)) => {
                self.query = text;
                self.refresh(db);
                self.mode = if self.query.is_empty() {
                    SearchInput
                } else {
                    Searching
                };
            }

            (SearchInput | Searching, Escape) => {
                if self.query.is_empty() {
                    self.mode = SearchIcon;
                } else {
                    self.query.clear();
                    self.mode = SearchInput;
                }
                self.filtered = None;
            }

            (SearchInput, ClickOutside) => {
                self.query.clear();
                self.filtered = None;
                self.mode = SearchIcon;
            }

            _ => {}
        }

        if self.mode != before {
            tracing::trace!(from = ?before, to = ?self.mode, "search mode changed");
        }
        self.mode
    }

    /// Re-derive the filter for the current query.
    pub fn refresh<S: DocStore>(&mut self, db: &DatabaseBlock<S>) {
        self.filtered = filter_rows(db, &self.query);
    }

    /// Rows to display, in row order.
    pub fn visible_rows<S: DocStore>(&self, db: &DatabaseBlock<S>) -> Vec<BlockId> {
        let rows = db.rows();
        match &self.filtered {
            None => rows,
            Some(hits) => rows.into_iter().filter(|r| hits.contains(r)).collect(),
        }
    }
}

/// Rows whose title or any cell contains `query`, case-insensitively.
/// An empty query clears the filter.
pub fn filter_rows<S: DocStore>(db: &DatabaseBlock<S>, query: &str) -> Option<Vec<BlockId>> {
    if query.is_empty() {
        return None;
    }
    let needle = query.to_lowercase();
    let cells = db.serialized_cells();

    let hits = db
        .rows()
        .into_iter()
        .filter(|row| {
            let title_hit = db
                .row_title(row)
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            title_hit
                || cells.get(row).is_some_and(|row_cells| {
                    row_cells
                        .values()
                        .flat_map(|cell| cell.value.flatten())
                        .any(|s| s.to_lowercase().contains(&needle))
                })
        })
        .collect::<Vec<_>>();
    tracing::trace!(query, hits = hits.len(), "rows filtered");
    Some(hits)
}
