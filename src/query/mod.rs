#![forbid(unsafe_code)]

//! Request translation and execution.
//!
//! A request (entity set, addressed selection and [`QueryOptions`]) is
//! turned into a [`QueryTree`], rendered into one SQL statement by the
//! [`QueryBuilder`], and the flat result rows are folded back into entity
//! trees by the [`Executor`]. [`QueryEngine`] chains the three.

/// SQL generation for select, count and existence statements.
pub mod builder;

/// Facade owning the catalog and function table.
pub mod engine;

/// Row routing, de-duplication and entity assembly.
pub mod executor;

/// Request options: `$filter`, `$orderby`, `$top`, `$skip`, `$select`,
/// `$expand` and `$count`.
pub mod options;

/// One node per requested entity set, indexed in pre-order.
pub mod parse_tree;

pub use builder::{BuilderConfig, QueryBuilder};
pub use engine::{Page, QueryEngine};
pub use executor::{Executor, QueryResult};
pub use options::{ExpandItem, OrderBy, QueryOptions, Selection};
pub use parse_tree::{alias_prefix, QueryNode, QueryTree};
