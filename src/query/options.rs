//! Parsed request options handed to the engine by the request layer.

use crate::error::{QueryError, Result};
use crate::filter::FilterTree;
use crate::model::{EntityId, EntityType};

/// One `$orderby` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Logical property name.
    pub property: String,
    /// Sort descending instead of ascending.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order on `property`.
    pub fn asc(property: impl Into<String>) -> Self {
        OrderBy {
            property: property.into(),
            descending: false,
        }
    }

    /// Descending order on `property`.
    pub fn desc(property: impl Into<String>) -> Self {
        OrderBy {
            property: property.into(),
            descending: true,
        }
    }

    /// Parses `"<property> [asc|desc]"`.
    pub fn parse(term: &str) -> Result<Self> {
        let mut parts = term.split_whitespace();
        let property = parts
            .next()
            .ok_or_else(|| QueryError::InvalidOption("empty $orderby term".into()))?;
        let descending = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(other) => {
                return Err(QueryError::InvalidOption(format!(
                    "unknown sort direction '{other}' in $orderby"
                )))
            }
        };
        if parts.next().is_some() {
            return Err(QueryError::InvalidOption(format!(
                "malformed $orderby term '{term}'"
            )));
        }
        Ok(OrderBy {
            property: property.to_owned(),
            descending,
        })
    }
}

/// Request options scoped to one entity set (the root or one expansion).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// `$filter`.
    pub filter: Option<FilterTree>,
    /// `$orderby`; empty means `id desc`.
    pub order_by: Vec<OrderBy>,
    /// `$top`.
    pub top: Option<u64>,
    /// `$skip`.
    pub skip: Option<u64>,
    /// `$select`; empty selects every property.
    pub select: Vec<String>,
    /// `$expand`.
    pub expand: Vec<ExpandItem>,
    /// `$count`; `Some(false)` suppresses the count statement.
    pub count: Option<bool>,
}

impl QueryOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `$filter`.
    pub fn with_filter(mut self, filter: impl Into<FilterTree>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Appends an `$orderby` term.
    pub fn with_order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Sets `$top`.
    pub fn with_top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }

    /// Sets `$skip`.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets `$select`.
    pub fn with_select<S: AsRef<str>>(mut self, properties: &[S]) -> Self {
        self.select = properties.iter().map(|p| p.as_ref().to_owned()).collect();
        self
    }

    /// Appends an `$expand` item.
    pub fn with_expand(mut self, item: ExpandItem) -> Self {
        self.expand.push(item);
        self
    }

    /// Sets `$count`.
    pub fn with_count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    /// Returns true when the entity id is part of the surfaced output.
    pub fn selects_id(&self) -> bool {
        self.select.is_empty() || self.select.iter().any(|p| p.eq_ignore_ascii_case("id"))
    }

    /// Projected properties of `entity_type` in declaration order, `id`
    /// always first.
    pub fn projected_properties(&self, entity_type: EntityType) -> Vec<&'static str> {
        entity_type
            .property_names()
            .iter()
            .copied()
            .filter(|name| {
                *name == "id"
                    || self.select.is_empty()
                    || self.select.iter().any(|s| s.eq_ignore_ascii_case(name))
            })
            .collect()
    }
}

/// One `$expand` entry: a navigation path and the options scoped to its
/// last segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandItem {
    /// Entity types along the path, e.g. `[Datastream, Observation]`.
    pub path: Vec<EntityType>,
    /// Options applied to the last segment.
    pub options: QueryOptions,
    /// Materialized only to evaluate a filter; never surfaced.
    pub generated: bool,
    /// Carries a filter hoisted from an outer scope; joined with
    /// `INNER JOIN LATERAL`.
    pub outer_filter: bool,
    /// The hoisted filter was detached from an `or` coupling.
    pub or_coupled: bool,
}

impl ExpandItem {
    /// Item for `path` with default options.
    pub fn new(path: Vec<EntityType>) -> Self {
        ExpandItem {
            path,
            options: QueryOptions::default(),
            generated: false,
            outer_filter: false,
            or_coupled: false,
        }
    }

    /// Parses a slash separated path of entity-set names such as
    /// `Datastreams/Observations`.
    pub fn parse(path: &str) -> Result<Self> {
        let path = path
            .split('/')
            .map(|segment| segment.trim().parse::<EntityType>())
            .collect::<Result<Vec<_>>>()?;
        if path.is_empty() {
            return Err(QueryError::InvalidOption("empty $expand path".into()));
        }
        Ok(ExpandItem::new(path))
    }

    /// Sets the scoped options.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Last entity type of the path.
    pub fn target(&self) -> Option<EntityType> {
        self.path.last().copied()
    }
}

/// Which rows of the target entity set a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The whole entity set.
    All,
    /// A single entity by id.
    ById(EntityId),
    /// Entities related to the `via` entity with the given id, e.g. the
    /// Datastreams of Thing 0.
    Related {
        /// Entity type addressed in the path.
        via: EntityType,
        /// Its id.
        id: EntityId,
    },
}
