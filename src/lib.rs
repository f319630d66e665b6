//! Translates OGC SensorThings requests into PostgreSQL statements and
//! folds the flat result rows back into nested entities.
//!
//! ```no_run
//! use sensorthings_query::{
//!     config::EngineConfig,
//!     model::EntityType,
//!     query::{ExpandItem, QueryEngine, QueryOptions, Selection},
//! };
//!
//! let engine = QueryEngine::new(EngineConfig::default());
//! let options = QueryOptions::new()
//!     .with_top(10)
//!     .with_expand(ExpandItem::new(vec![EntityType::Datastream]));
//! let sql = engine.explain(EntityType::Thing, &Selection::All, &options)?;
//! println!("{sql}");
//! # Ok::<(), sensorthings_query::QueryError>(())
//! ```

#![warn(missing_docs)]

/// Connections the engine runs statements through.
pub mod backend;
/// Entity-to-table, property-to-column and join resolution.
pub mod catalog;
/// TOML engine configuration.
pub mod config;
/// Error types.
pub mod error;
/// `$filter` trees, compilation and hoisting.
pub mod filter;
/// Entity types, records and value cells.
pub mod model;
/// Request options, SQL building and result assembly.
pub mod query;

pub use error::{BackendError, Phase, QueryError, Result};
pub use model::{Entity, EntityType, Value};
pub use query::{Page, QueryEngine};
