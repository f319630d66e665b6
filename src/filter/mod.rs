#![forbid(unsafe_code)]

//! `$filter` handling: the token arena, its SQL compiler and the hoisting
//! pass that pushes navigation filters into expansions.

/// Filter-to-SQL compilation.
pub mod compiler;

/// Function-call translators keyed by name.
pub mod functions;

/// Navigation filter hoisting.
pub mod hoist;

/// Literal rewriting for coded and timestamp properties.
pub mod prepare;

/// Arena-backed filter expression tree.
pub mod tree;

pub use compiler::{CompileContext, FilterCompiler};
pub use functions::FunctionTable;
pub use hoist::hoist;
pub use prepare::prepare_filter;
pub use tree::{FilterExpr, FilterTree, NodeId, Token, TokenKind};
