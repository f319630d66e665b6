//! Entity records, the closed [`Entity`] union and the row factories that
//! decode executor field maps into records.
#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::model::codes::{EncodingType, ObservationType};
use crate::model::time::postgres_range_to_iso8601;
use crate::model::{EntityType, Value};

/// Identifier of a stored entity.
pub type EntityId = i64;

/// One node's slice of a result row, keyed by `<table>_<column>` alias.
pub type Fields = BTreeMap<String, Value>;

/// A physical or virtual object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub properties: Option<serde_json::Value>,
    #[serde(rename = "Locations", skip_serializing_if = "Option::is_none", default)]
    pub locations: Option<Vec<Location>>,
    #[serde(rename = "HistoricalLocations", skip_serializing_if = "Option::is_none", default)]
    pub historical_locations: Option<Vec<HistoricalLocation>>,
    #[serde(rename = "Datastreams", skip_serializing_if = "Option::is_none", default)]
    pub datastreams: Option<Vec<Datastream>>,
}

/// Last known location of one or more Things.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub encoding_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<serde_json::Value>,
    #[serde(rename = "Things", skip_serializing_if = "Option::is_none", default)]
    pub things: Option<Vec<Thing>>,
    #[serde(rename = "HistoricalLocations", skip_serializing_if = "Option::is_none", default)]
    pub historical_locations: Option<Vec<HistoricalLocation>>,
}

/// Time-stamped association of a Thing with its Locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalLocation {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time: Option<String>,
    #[serde(rename = "Thing", skip_serializing_if = "Option::is_none", default)]
    pub thing: Option<Box<Thing>>,
    #[serde(rename = "Locations", skip_serializing_if = "Option::is_none", default)]
    pub locations: Option<Vec<Location>>,
}

/// Instrument that produces observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub encoding_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<String>,
    #[serde(rename = "Datastreams", skip_serializing_if = "Option::is_none", default)]
    pub datastreams: Option<Vec<Datastream>>,
}

/// The phenomenon a Datastream observes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedProperty {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(rename = "Datastreams", skip_serializing_if = "Option::is_none", default)]
    pub datastreams: Option<Vec<Datastream>>,
}

/// Observations of one ObservedProperty by one Sensor on one Thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datastream {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit_of_measurement: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub observation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub observed_area: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phenomenon_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result_time: Option<String>,
    #[serde(rename = "Thing", skip_serializing_if = "Option::is_none", default)]
    pub thing: Option<Box<Thing>>,
    #[serde(rename = "Sensor", skip_serializing_if = "Option::is_none", default)]
    pub sensor: Option<Box<Sensor>>,
    #[serde(rename = "ObservedProperty", skip_serializing_if = "Option::is_none", default)]
    pub observed_property: Option<Box<ObservedProperty>>,
    #[serde(rename = "Observations", skip_serializing_if = "Option::is_none", default)]
    pub observations: Option<Vec<Observation>>,
}

/// A single measured value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phenomenon_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result_quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub valid_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(rename = "Datastream", skip_serializing_if = "Option::is_none", default)]
    pub datastream: Option<Box<Datastream>>,
    #[serde(rename = "FeatureOfInterest", skip_serializing_if = "Option::is_none", default)]
    pub feature_of_interest: Option<Box<FeatureOfInterest>>,
}

/// The feature an Observation was made about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureOfInterest {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub encoding_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub feature: Option<serde_json::Value>,
    #[serde(rename = "Observations", skip_serializing_if = "Option::is_none", default)]
    pub observations: Option<Vec<Observation>>,
}

/// Closed union over every entity record the executor can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    /// See [`Thing`].
    Thing(Thing),
    /// See [`Location`].
    Location(Location),
    /// See [`HistoricalLocation`].
    HistoricalLocation(HistoricalLocation),
    /// See [`Sensor`].
    Sensor(Sensor),
    /// See [`ObservedProperty`].
    ObservedProperty(ObservedProperty),
    /// See [`Datastream`].
    Datastream(Datastream),
    /// See [`Observation`].
    Observation(Observation),
    /// See [`FeatureOfInterest`].
    FeatureOfInterest(FeatureOfInterest),
}

trait Variant: Sized {
    fn from_entity(entity: Entity) -> Option<Self>;
}

macro_rules! entity_variant {
    ($($name:ident),* $(,)?) => {
        $(
            impl Variant for $name {
                fn from_entity(entity: Entity) -> Option<Self> {
                    match entity {
                        Entity::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$name> for Entity {
                fn from(value: $name) -> Self {
                    Entity::$name(value)
                }
            }
        )*
    };
}

entity_variant!(
    Thing,
    Location,
    HistoricalLocation,
    Sensor,
    ObservedProperty,
    Datastream,
    Observation,
    FeatureOfInterest,
);

fn many<T: Variant>(children: Vec<Entity>) -> Option<Vec<T>> {
    Some(children.into_iter().filter_map(T::from_entity).collect())
}

fn one<T: Variant>(children: Vec<Entity>) -> Option<Box<T>> {
    children.into_iter().find_map(T::from_entity).map(Box::new)
}

impl Entity {
    /// Entity type of the wrapped record.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Thing(_) => EntityType::Thing,
            Entity::Location(_) => EntityType::Location,
            Entity::HistoricalLocation(_) => EntityType::HistoricalLocation,
            Entity::Sensor(_) => EntityType::Sensor,
            Entity::ObservedProperty(_) => EntityType::ObservedProperty,
            Entity::Datastream(_) => EntityType::Datastream,
            Entity::Observation(_) => EntityType::Observation,
            Entity::FeatureOfInterest(_) => EntityType::FeatureOfInterest,
        }
    }

    /// Identifier of the wrapped record, if set.
    pub fn id(&self) -> Option<EntityId> {
        match self {
            Entity::Thing(e) => e.id,
            Entity::Location(e) => e.id,
            Entity::HistoricalLocation(e) => e.id,
            Entity::Sensor(e) => e.id,
            Entity::ObservedProperty(e) => e.id,
            Entity::Datastream(e) => e.id,
            Entity::Observation(e) => e.id,
            Entity::FeatureOfInterest(e) => e.id,
        }
    }

    /// Overwrites the identifier of the wrapped record.
    pub fn set_id(&mut self, id: Option<EntityId>) {
        match self {
            Entity::Thing(e) => e.id = id,
            Entity::Location(e) => e.id = id,
            Entity::HistoricalLocation(e) => e.id = id,
            Entity::Sensor(e) => e.id = id,
            Entity::ObservedProperty(e) => e.id = id,
            Entity::Datastream(e) => e.id = id,
            Entity::Observation(e) => e.id = id,
            Entity::FeatureOfInterest(e) => e.id = id,
        }
    }

    /// Attaches related entities of `child_type` to the matching navigation
    /// property. Collections are always set (possibly empty); singletons are
    /// set only when a child exists.
    ///
    /// Returns `false` when `child_type` is not a navigation property of this
    /// entity.
    pub fn attach(&mut self, child_type: EntityType, children: Vec<Entity>) -> bool {
        use EntityType as T;
        match (self, child_type) {
            (Entity::Thing(e), T::Location) => e.locations = many(children),
            (Entity::Thing(e), T::HistoricalLocation) => e.historical_locations = many(children),
            (Entity::Thing(e), T::Datastream) => e.datastreams = many(children),
            (Entity::Location(e), T::Thing) => e.things = many(children),
            (Entity::Location(e), T::HistoricalLocation) => {
                e.historical_locations = many(children)
            }
            (Entity::HistoricalLocation(e), T::Thing) => e.thing = one(children),
            (Entity::HistoricalLocation(e), T::Location) => e.locations = many(children),
            (Entity::Sensor(e), T::Datastream) => e.datastreams = many(children),
            (Entity::ObservedProperty(e), T::Datastream) => e.datastreams = many(children),
            (Entity::Datastream(e), T::Thing) => e.thing = one(children),
            (Entity::Datastream(e), T::Sensor) => e.sensor = one(children),
            (Entity::Datastream(e), T::ObservedProperty) => e.observed_property = one(children),
            (Entity::Datastream(e), T::Observation) => e.observations = many(children),
            (Entity::Observation(e), T::Datastream) => e.datastream = one(children),
            (Entity::Observation(e), T::FeatureOfInterest) => {
                e.feature_of_interest = one(children)
            }
            (Entity::FeatureOfInterest(e), T::Observation) => e.observations = many(children),
            _ => return false,
        }
        true
    }

    /// Lists mandatory fields that are missing for a create request.
    pub fn missing_mandatory_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut check = |present: bool, name: &'static str| {
            if !present {
                missing.push(name);
            }
        };
        match self {
            Entity::Thing(e) => check(e.description.is_some(), "description"),
            Entity::Location(e) => {
                check(e.description.is_some(), "description");
                check(e.encoding_type.is_some(), "encodingType");
                check(e.location.is_some(), "location");
            }
            Entity::HistoricalLocation(e) => check(e.time.is_some(), "time"),
            Entity::Sensor(e) => {
                check(e.description.is_some(), "description");
                check(e.encoding_type.is_some(), "encodingType");
                check(e.metadata.is_some(), "metadata");
            }
            Entity::ObservedProperty(e) => {
                check(e.name.is_some(), "name");
                check(e.definition.is_some(), "definition");
                check(e.description.is_some(), "description");
            }
            Entity::Datastream(e) => {
                check(e.description.is_some(), "description");
                check(e.unit_of_measurement.is_some(), "unitOfMeasurement");
                check(e.observation_type.is_some(), "observationType");
                check(e.thing.is_some(), "Thing");
                check(e.sensor.is_some(), "Sensor");
                check(e.observed_property.is_some(), "ObservedProperty");
            }
            Entity::Observation(e) => {
                check(e.phenomenon_time.is_some(), "phenomenonTime");
                check(e.result.is_some(), "result");
                check(e.result_time.is_some(), "resultTime");
                check(e.datastream.is_some(), "Datastream");
            }
            Entity::FeatureOfInterest(e) => {
                check(e.description.is_some(), "description");
                check(e.encoding_type.is_some(), "encodingType");
                check(e.feature.is_some(), "feature");
            }
        }
        missing
    }
}

/// Row-to-entity decoder bound to one entity type.
///
/// Resolved once per parse-tree node; link types have no factory.
#[derive(Clone, Copy)]
pub struct RowFactory {
    entity_type: EntityType,
    parse: fn(&FieldReader<'_>) -> Result<Entity>,
}

impl std::fmt::Debug for RowFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RowFactory").field(&self.entity_type).finish()
    }
}

impl RowFactory {
    /// Returns the factory for `entity_type`, or `None` for link types.
    pub fn for_type(entity_type: EntityType) -> Option<RowFactory> {
        let parse: fn(&FieldReader<'_>) -> Result<Entity> = match entity_type {
            EntityType::Thing => parse_thing,
            EntityType::Location => parse_location,
            EntityType::HistoricalLocation => parse_historical_location,
            EntityType::Sensor => parse_sensor,
            EntityType::ObservedProperty => parse_observed_property,
            EntityType::Datastream => parse_datastream,
            EntityType::Observation => parse_observation,
            EntityType::FeatureOfInterest => parse_feature_of_interest,
            EntityType::ThingToLocation | EntityType::LocationToHistoricalLocation => return None,
        };
        Some(RowFactory { entity_type, parse })
    }

    /// Entity type this factory produces.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Decodes one node's field map into an entity.
    pub fn parse(&self, fields: &Fields) -> Result<Entity> {
        (self.parse)(&FieldReader {
            entity_type: self.entity_type,
            fields,
        })
    }
}

/// Typed accessors over a field map; absent and NULL cells read as `None`.
pub struct FieldReader<'a> {
    entity_type: EntityType,
    fields: &'a Fields,
}

impl FieldReader<'_> {
    fn cell(&self, property: &str) -> Option<&Value> {
        let key = format!(
            "{}_{}",
            self.entity_type.table(),
            property.to_ascii_lowercase()
        );
        self.fields.get(&key).filter(|v| !v.is_null())
    }

    fn id(&self) -> Result<Option<EntityId>> {
        match self.cell("id") {
            None => Ok(None),
            Some(cell) => cell
                .as_i64()
                .map(Some)
                .ok_or_else(|| QueryError::decode(self.entity_type, format!("id {cell:?} is not an integer"))),
        }
    }

    fn text(&self, property: &str) -> Option<String> {
        self.cell(property).and_then(Value::as_text)
    }

    fn json(&self, property: &str) -> Option<serde_json::Value> {
        self.cell(property).cloned().map(Value::into_json)
    }

    fn encoding(&self) -> Result<Option<String>> {
        let Some(cell) = self.cell("encodingType") else {
            return Ok(None);
        };
        match cell {
            Value::String(text) if text.parse::<i64>().is_err() => Ok(Some(text.clone())),
            other => other
                .as_i64()
                .and_then(EncodingType::from_code)
                .map(|e| Some(e.value().to_owned()))
                .ok_or_else(|| {
                    QueryError::decode(self.entity_type, format!("unknown encoding type {other:?}"))
                }),
        }
    }

    fn period(&self, property: &str) -> Option<String> {
        self.text(property).map(|t| postgres_range_to_iso8601(&t))
    }
}

fn parse_thing(row: &FieldReader<'_>) -> Result<Entity> {
    Ok(Entity::Thing(Thing {
        id: row.id()?,
        name: row.text("name"),
        description: row.text("description"),
        properties: row.json("properties"),
        ..Thing::default()
    }))
}

fn parse_location(row: &FieldReader<'_>) -> Result<Entity> {
    Ok(Entity::Location(Location {
        id: row.id()?,
        name: row.text("name"),
        description: row.text("description"),
        encoding_type: row.encoding()?,
        location: row.json("location"),
        ..Location::default()
    }))
}

fn parse_historical_location(row: &FieldReader<'_>) -> Result<Entity> {
    Ok(Entity::HistoricalLocation(HistoricalLocation {
        id: row.id()?,
        time: row.text("time"),
        ..HistoricalLocation::default()
    }))
}

fn parse_sensor(row: &FieldReader<'_>) -> Result<Entity> {
    Ok(Entity::Sensor(Sensor {
        id: row.id()?,
        name: row.text("name"),
        description: row.text("description"),
        encoding_type: row.encoding()?,
        metadata: row.text("metadata"),
        ..Sensor::default()
    }))
}

fn parse_observed_property(row: &FieldReader<'_>) -> Result<Entity> {
    Ok(Entity::ObservedProperty(ObservedProperty {
        id: row.id()?,
        name: row.text("name"),
        definition: row.text("definition"),
        description: row.text("description"),
        ..ObservedProperty::default()
    }))
}

fn parse_datastream(row: &FieldReader<'_>) -> Result<Entity> {
    let observation_type = match row.cell("observationType") {
        None => None,
        Some(cell) => Some(
            cell.as_i64()
                .and_then(ObservationType::from_code)
                .map(ObservationType::uri)
                .ok_or_else(|| {
                    QueryError::decode(
                        EntityType::Datastream,
                        format!("unknown observation type {cell:?}"),
                    )
                })?,
        ),
    };
    Ok(Entity::Datastream(Datastream {
        id: row.id()?,
        name: row.text("name"),
        description: row.text("description"),
        unit_of_measurement: row.json("unitOfMeasurement"),
        observation_type,
        observed_area: row.json("observedArea"),
        phenomenon_time: row.period("phenomenonTime"),
        result_time: row.period("resultTime"),
        ..Datastream::default()
    }))
}

fn parse_observation(row: &FieldReader<'_>) -> Result<Entity> {
    Ok(Entity::Observation(Observation {
        id: row.id()?,
        phenomenon_time: row.text("phenomenonTime"),
        result: row.json("result"),
        result_time: row.text("resultTime"),
        result_quality: row.text("resultQuality"),
        valid_time: row.text("validTime"),
        parameters: row.json("parameters"),
        ..Observation::default()
    }))
}

fn parse_feature_of_interest(row: &FieldReader<'_>) -> Result<Entity> {
    Ok(Entity::FeatureOfInterest(FeatureOfInterest {
        id: row.id()?,
        name: row.text("name"),
        description: row.text("description"),
        encoding_type: row.encoding()?,
        feature: row.json("feature"),
        ..FeatureOfInterest::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn datastream_factory_decodes_codes_and_ranges() {
        let factory = RowFactory::for_type(EntityType::Datastream).expect("factory");
        let entity = factory
            .parse(&fields(&[
                ("datastream_id", Value::Int(7)),
                ("datastream_name", Value::from("temp")),
                ("datastream_observationtype", Value::Int(3)),
                ("datastream_unitofmeasurement", Value::from(r#"{"symbol":"degC"}"#)),
                (
                    "datastream_phenomenontime",
                    Value::from(r#"["2014-03-01 13:00:00+00","2015-05-11 15:30:00+00"]"#),
                ),
                ("datastream_resulttime", Value::Null),
            ]))
            .expect("parse");
        let Entity::Datastream(ds) = entity else {
            panic!("unexpected entity {entity:?}");
        };
        assert_eq!(ds.id, Some(7));
        assert_eq!(
            ds.observation_type.as_deref(),
            Some("http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement")
        );
        assert_eq!(ds.unit_of_measurement, Some(json!({"symbol": "degC"})));
        assert_eq!(
            ds.phenomenon_time.as_deref(),
            Some("2014-03-01T13:00:00.000Z/2015-05-11T15:30:00.000Z")
        );
        assert!(ds.result_time.is_none());
    }

    #[test]
    fn non_integer_id_is_a_decode_error() {
        let factory = RowFactory::for_type(EntityType::Thing).expect("factory");
        let err = factory
            .parse(&fields(&[("thing_id", Value::from("abc"))]))
            .expect_err("should fail");
        assert_eq!(err.code(), "Decode");
    }

    #[test]
    fn link_types_have_no_factory() {
        assert!(RowFactory::for_type(EntityType::ThingToLocation).is_none());
    }

    #[test]
    fn attach_follows_cardinality() {
        let mut ds = Entity::Datastream(Datastream::default());
        let thing = Entity::Thing(Thing {
            id: Some(1),
            ..Thing::default()
        });
        assert!(ds.attach(EntityType::Thing, vec![thing]));
        assert!(ds.attach(EntityType::Observation, Vec::new()));
        assert!(!ds.attach(EntityType::Location, Vec::new()));
        let Entity::Datastream(ds) = ds else {
            unreachable!()
        };
        assert_eq!(ds.thing.and_then(|t| t.id), Some(1));
        assert_eq!(ds.observations, Some(Vec::new()));
    }

    #[test]
    fn serializes_sensorthings_shape() {
        let thing = Entity::Thing(Thing {
            id: Some(3),
            name: Some("buoy".into()),
            datastreams: Some(Vec::new()),
            ..Thing::default()
        });
        assert_eq!(
            serde_json::to_value(&thing).expect("serialize"),
            json!({"@iot.id": 3, "name": "buoy", "Datastreams": []})
        );
    }

    #[test]
    fn reports_missing_mandatory_fields() {
        let obs = Entity::Observation(Observation {
            result: Some(json!(1.5)),
            ..Observation::default()
        });
        assert_eq!(
            obs.missing_mandatory_fields(),
            vec!["phenomenonTime", "resultTime", "Datastream"]
        );
    }
}
