//! Domain vocabulary: entity types, code tables, result cells and records.

pub mod codes;
pub mod entities;
mod entity_type;
pub mod time;
mod value;

pub use entities::{Entity, EntityId, Fields, RowFactory};
pub use entity_type::EntityType;
pub use value::Value;
