//! Error types shared by the catalog, compiler, builder and executor.

use std::fmt;

use thiserror::Error;

use crate::model::EntityType;

/// Convenience alias used throughout the crate.
pub type Result<T, E = QueryError> = std::result::Result<T, E>;

/// Identifies which statement of a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The main entity select.
    Select,
    /// The optional `$count` statement.
    Count,
    /// An entity existence check.
    Exists,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Select => write!(f, "query"),
            Phase::Count => write!(f, "count"),
            Phase::Exists => write!(f, "exists"),
        }
    }
}

/// Errors raised by a [`crate::backend::SqlConnection`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// SQLite driver failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Any other driver failure, carried as text.
    #[error("{0}")]
    Message(String),
}

/// Structured errors emitted while translating or executing a request.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Property name is absent from the schema catalog.
    #[error("unknown property '{prop}' on {entity}")]
    UnknownProperty {
        /// Entity type the property was resolved against.
        entity: EntityType,
        /// Property as supplied by the caller.
        prop: String,
    },
    /// No join template exists between the two entity types.
    #[error("no relation from {get} to {by}")]
    UnknownRelation {
        /// Entity type being fetched.
        get: EntityType,
        /// Entity type it was addressed through.
        by: EntityType,
    },
    /// Entity set name did not match any entity type.
    #[error("unknown entity set '{name}'")]
    UnknownEntitySet {
        /// Name as supplied.
        name: String,
    },
    /// Filter referenced a function with no translator.
    #[error("unsupported filter function '{name}'")]
    UnsupportedFunction {
        /// Function name as it appeared in the filter.
        name: String,
    },
    /// A request option could not be honored.
    #[error("invalid query option: {0}")]
    InvalidOption(String),
    /// A result row could not be turned into an entity.
    #[error("cannot decode {entity} from row: {reason}")]
    Decode {
        /// Entity type of the failing node.
        entity: EntityType,
        /// Human readable cause.
        reason: String,
    },
    /// The backend failed while running a statement.
    #[error("error executing {phase}: {source}")]
    Execution {
        /// Which statement failed.
        phase: Phase,
        /// Driver error.
        #[source]
        source: BackendError,
    },
}

impl QueryError {
    /// Builds a [`QueryError::Decode`] for the given entity type.
    pub fn decode(entity: EntityType, reason: impl Into<String>) -> Self {
        QueryError::Decode {
            entity,
            reason: reason.into(),
        }
    }

    /// Wraps a backend failure with the phase that produced it.
    pub fn execution(phase: Phase, source: BackendError) -> Self {
        QueryError::Execution { phase, source }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownProperty { .. } => "UnknownProperty",
            QueryError::UnknownRelation { .. } => "UnknownRelation",
            QueryError::UnknownEntitySet { .. } => "UnknownEntitySet",
            QueryError::UnsupportedFunction { .. } => "UnsupportedFunction",
            QueryError::InvalidOption(_) => "InvalidOption",
            QueryError::Decode { .. } => "Decode",
            QueryError::Execution { .. } => "Execution",
        }
    }
}

/// Convenience wrapper that formats query errors with their codes.
pub struct QueryErrorWithCode<'a>(pub &'a QueryError);

impl fmt::Display for QueryErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
