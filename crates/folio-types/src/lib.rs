//! Shared identifiers, block flavours, and configuration for Folio.
//!
//! A pure leaf crate: no internal folio dependencies. Everything above it
//! (the document store, the database block, the edgeless surface) speaks in
//! these types.
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`BlockId`]       | Node in the document tree                    |
//! | [`ColumnId`]      | Database column (key in `yColumns`/`yCells`) |
//! | [`Flavour`]       | Block type tag                               |
//! | [`FolioConfig`]   | Store, database, and edgeless tuning         |
//! |-------------------|----------------------------------------------|

pub mod config;
pub mod flavour;
pub mod ids;

pub use config::{ConfigError, DatabaseConfig, EdgelessConfig, FolioConfig, StoreConfig};
pub use flavour::Flavour;
pub use ids::{BlockId, ColumnId, generate_id};
