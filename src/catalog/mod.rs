//! Schema catalog bridging logical entity properties to physical SQL.
//!
//! The catalog is built once per engine and shared read-only across
//! requests. Every lookup returns a [`Resolution`] so callers decide
//! whether an unknown name is fatal.

mod joins;

use std::collections::HashMap;

use crate::model::EntityType;

pub use joins::JoinCondition;

/// Timestamp format used when rendering stored times as text.
pub const TIME_FORMAT: &str = r#"YYYY-MM-DD"T"HH24:MI:SS.MSZ"#;

/// Select expression of the polymorphic observation result.
pub const OBSERVATION_RESULT: &str = "observation.data -> 'result'";

/// Outcome of a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The name is known to the catalog.
    Resolved(T),
    /// The name is not known to the catalog.
    Unknown,
}

impl<T> Resolution<T> {
    /// Converts into an `Option`, discarding the unknown case.
    pub fn resolved(self) -> Option<T> {
        match self {
            Resolution::Resolved(v) => Some(v),
            Resolution::Unknown => None,
        }
    }

    /// Returns true when the lookup succeeded.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Maps the resolved value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Resolved(v) => Resolution::Resolved(f(v)),
            Resolution::Unknown => Resolution::Unknown,
        }
    }

    /// Fails with `err` when the lookup did not resolve.
    pub fn ok_or_else<E>(self, err: impl FnOnce() -> E) -> Result<T, E> {
        match self {
            Resolution::Resolved(v) => Ok(v),
            Resolution::Unknown => Err(err()),
        }
    }
}

impl<T> From<Option<T>> for Resolution<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Resolution::Resolved(v),
            None => Resolution::Unknown,
        }
    }
}

/// One projectable column of an entity table.
#[derive(Debug, Clone)]
pub struct Column {
    /// Lower-case logical name (`unitofmeasurement`, `thing_id`).
    pub name: String,
    /// Physical select expression.
    pub expr: String,
    /// Column alias, `<table>_<name>`.
    pub alias: String,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    table: String,
    columns: Vec<Column>,
    foreign_keys: &'static [&'static str],
}

impl CatalogEntry {
    fn column(&self, name: &str) -> Option<&Column> {
        let name = name.to_ascii_lowercase();
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Static knowledge of tables, columns and relations.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schema: Option<String>,
    entries: HashMap<EntityType, CatalogEntry>,
}

fn foreign_keys(entity_type: EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::Datastream => &["thing_id", "sensor_id", "observedproperty_id"],
        EntityType::Observation => &["stream_id", "featureofinterest_id"],
        EntityType::HistoricalLocation => &["thing_id"],
        _ => &[],
    }
}

fn select_expression(entity_type: EntityType, column: &str) -> String {
    let table = entity_type.table();
    match (entity_type, column) {
        (EntityType::Location, "location")
        | (EntityType::FeatureOfInterest, "feature")
        | (EntityType::Datastream, "observedarea") => {
            format!("public.ST_AsGeoJSON({table}.{column})")
        }
        (EntityType::HistoricalLocation, "time") => {
            format!("to_char({table}.time at time zone 'UTC', '{TIME_FORMAT}')")
        }
        (EntityType::Observation, "result") => OBSERVATION_RESULT.to_owned(),
        (EntityType::Observation, "parameters") => "observation.data -> 'parameters'".to_owned(),
        (EntityType::Observation, "phenomenontime") => {
            "observation.data ->> 'phenomenonTime'".to_owned()
        }
        (EntityType::Observation, "resulttime") => "observation.data ->> 'resultTime'".to_owned(),
        (EntityType::Observation, "resultquality") => {
            "observation.data ->> 'resultQuality'".to_owned()
        }
        (EntityType::Observation, "validtime") => "observation.data ->> 'validTime'".to_owned(),
        _ => format!("{table}.{column}"),
    }
}

impl SchemaCatalog {
    /// Builds the catalog, qualifying tables with `schema` when given.
    pub fn new(schema: Option<&str>) -> Self {
        let entries = EntityType::PUBLIC
            .into_iter()
            .map(|et| {
                let table = et.table();
                let names = et
                    .property_names()
                    .iter()
                    .map(|p| p.to_ascii_lowercase())
                    .chain(foreign_keys(et).iter().map(|fk| (*fk).to_owned()));
                let columns = names
                    .map(|name| Column {
                        expr: select_expression(et, &name),
                        alias: format!("{table}_{name}"),
                        name,
                    })
                    .collect();
                let entry = CatalogEntry {
                    table: table.to_owned(),
                    columns,
                    foreign_keys: foreign_keys(et),
                };
                (et, entry)
            })
            .collect();
        SchemaCatalog {
            schema: schema.filter(|s| !s.is_empty()).map(str::to_owned),
            entries,
        }
    }

    /// Table expression for `entity_type`, schema-qualified when configured.
    pub fn resolve_table(&self, entity_type: EntityType) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", entity_type.table()),
            None => entity_type.table().to_owned(),
        }
    }

    /// Select expression for a logical property (case-insensitive).
    pub fn resolve_column(&self, entity_type: EntityType, property: &str) -> Resolution<String> {
        self.column(entity_type, property).map(|c| c.expr.clone())
    }

    /// Full column description for a logical property.
    pub fn column(&self, entity_type: EntityType, property: &str) -> Resolution<&Column> {
        self.entries
            .get(&entity_type)
            .and_then(|entry| entry.column(property))
            .into()
    }

    /// Alias a property is projected under inside derived tables.
    pub fn column_alias(&self, entity_type: EntityType, property: &str) -> String {
        format!(
            "{}_{}",
            entity_type.table(),
            property.to_ascii_lowercase()
        )
    }

    /// Every select expression of `entity_type`, declared properties first
    /// and foreign keys last. Empty for the link tables.
    pub fn select_expressions(&self, entity_type: EntityType) -> &[Column] {
        self.entries
            .get(&entity_type)
            .map(|entry| entry.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Join-only foreign-key column names held by `entity_type`.
    pub fn foreign_keys(&self, entity_type: EntityType) -> &'static [&'static str] {
        self.entries
            .get(&entity_type)
            .map(|entry| entry.foreign_keys)
            .unwrap_or(&[])
    }

    /// Raw `table.column` reference for the geometry columns that may be
    /// addressed without the GeoJSON cast.
    pub fn raw_column(&self, entity_type: EntityType, property: &str) -> Resolution<String> {
        let property = property.to_ascii_lowercase();
        match (entity_type, property.as_str()) {
            (EntityType::Location, "location")
            | (EntityType::FeatureOfInterest, "feature")
            | (EntityType::Datastream, "observedarea") => {
                Resolution::Resolved(format!("{}.{property}", entity_type.table()))
            }
            _ => Resolution::Unknown,
        }
    }

    /// Returns true when `property` is stored as a geometry.
    pub fn is_geometry(&self, entity_type: EntityType, property: &str) -> bool {
        self.raw_column(entity_type, property).is_resolved()
    }

    /// Table name used by the catalog, without schema.
    pub fn table_name(&self, entity_type: EntityType) -> &str {
        self.entries
            .get(&entity_type)
            .map(|entry| entry.table.as_str())
            .unwrap_or_else(|| entity_type.table())
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        SchemaCatalog::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_and_computed_columns() {
        let catalog = SchemaCatalog::default();
        assert_eq!(
            catalog.resolve_column(EntityType::Thing, "name"),
            Resolution::Resolved("thing.name".to_owned())
        );
        assert_eq!(
            catalog.resolve_column(EntityType::Location, "location").resolved().as_deref(),
            Some("public.ST_AsGeoJSON(location.location)")
        );
        assert_eq!(
            catalog.resolve_column(EntityType::Observation, "Result").resolved().as_deref(),
            Some(OBSERVATION_RESULT)
        );
        assert_eq!(
            catalog
                .resolve_column(EntityType::HistoricalLocation, "time")
                .resolved()
                .as_deref(),
            Some(r#"to_char(historicallocation.time at time zone 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS.MSZ')"#)
        );
        assert_eq!(catalog.resolve_column(EntityType::Thing, "Price"), Resolution::Unknown);
    }

    #[test]
    fn schema_qualifies_tables_only() {
        let catalog = SchemaCatalog::new(Some("v1"));
        assert_eq!(catalog.resolve_table(EntityType::Datastream), "v1.datastream");
        assert_eq!(catalog.table_name(EntityType::Datastream), "datastream");
        assert_eq!(
            catalog.resolve_column(EntityType::Datastream, "id").resolved().as_deref(),
            Some("datastream.id")
        );
        assert_eq!(SchemaCatalog::new(Some("")).resolve_table(EntityType::Thing), "thing");
    }

    #[test]
    fn foreign_keys_resolve_but_are_not_properties() {
        let catalog = SchemaCatalog::default();
        assert_eq!(
            catalog.foreign_keys(EntityType::Observation),
            &["stream_id", "featureofinterest_id"]
        );
        assert!(catalog.column(EntityType::Datastream, "thing_id").is_resolved());
        assert!(!EntityType::Datastream.property_names().contains(&"thing_id"));
        assert_eq!(
            catalog.column_alias(EntityType::Datastream, "unitOfMeasurement"),
            "datastream_unitofmeasurement"
        );
    }

    #[test]
    fn geometry_allow_list() {
        let catalog = SchemaCatalog::default();
        assert!(catalog.is_geometry(EntityType::Location, "location"));
        assert!(catalog.is_geometry(EntityType::FeatureOfInterest, "feature"));
        assert!(!catalog.is_geometry(EntityType::Thing, "properties"));
    }

    #[test]
    fn select_expressions_list_properties_then_keys() {
        let catalog = SchemaCatalog::default();
        let columns: Vec<(&str, &str)> = catalog
            .select_expressions(EntityType::HistoricalLocation)
            .iter()
            .map(|c| (c.alias.as_str(), c.expr.as_str()))
            .collect();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0], ("historicallocation_id", "historicallocation.id"));
        assert!(columns[1].1.starts_with("to_char(historicallocation.time"));
        assert_eq!(
            columns[2],
            ("historicallocation_thing_id", "historicallocation.thing_id")
        );
        assert!(catalog.select_expressions(EntityType::ThingToLocation).is_empty());
    }
}
