//! Join templates between related entity types.

use std::fmt;

use super::{Resolution, SchemaCatalog};
use crate::model::{EntityId, EntityType};

/// Correlation between the rows of one entity table and a row of a related
/// entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    /// Link-table join needed for many-to-many relations.
    pub link: Option<String>,
    /// Predicate correlating the two sides.
    pub predicate: String,
}

impl JoinCondition {
    fn direct(predicate: String) -> Self {
        JoinCondition {
            link: None,
            predicate,
        }
    }

    fn linked(link: String, predicate: String) -> Self {
        JoinCondition {
            link: Some(link),
            predicate,
        }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{link} WHERE {}", self.predicate),
            None => write!(f, "WHERE {}", self.predicate),
        }
    }
}

/// References `column` of the `by` side: a raw table column when `prefix`
/// is empty, otherwise the aliased column of the `<prefix>_<table>`
/// derived table.
fn correlated(by: EntityType, column: &str, prefix: &str) -> String {
    let table = by.table();
    if prefix.is_empty() {
        format!("{table}.{column}")
    } else {
        format!("{prefix}_{table}.{table}_{column}")
    }
}

impl SchemaCatalog {
    /// Resolves the fragment that restricts `get` rows to those related to
    /// the current `by` row.
    ///
    /// Returns [`Resolution::Unknown`] when the two types are not related.
    pub fn resolve_join(
        &self,
        get: EntityType,
        by: EntityType,
        prefix: &str,
    ) -> Resolution<JoinCondition> {
        use EntityType as T;
        let thing_to_location = self.resolve_table(T::ThingToLocation);
        let location_to_hl = self.resolve_table(T::LocationToHistoricalLocation);
        let by_id = || correlated(by, "id", prefix);
        let join = match (get, by) {
            (T::Thing, T::Datastream) | (T::Thing, T::HistoricalLocation) => {
                JoinCondition::direct(format!("thing.id = {}", correlated(by, "thing_id", prefix)))
            }
            (T::Thing, T::Location) => JoinCondition::linked(
                format!("INNER JOIN {thing_to_location} ON thing_to_location.thing_id = thing.id"),
                format!("thing_to_location.location_id = {}", by_id()),
            ),
            (T::Location, T::HistoricalLocation) => JoinCondition::linked(
                format!(
                    "INNER JOIN {location_to_hl} ON location_to_historicallocation.location_id = location.id"
                ),
                format!(
                    "location_to_historicallocation.historicallocation_id = {}",
                    by_id()
                ),
            ),
            (T::Location, T::Thing) => JoinCondition::linked(
                format!(
                    "INNER JOIN {thing_to_location} ON thing_to_location.location_id = location.id"
                ),
                format!("thing_to_location.thing_id = {}", by_id()),
            ),
            (T::HistoricalLocation, T::Location) => JoinCondition::linked(
                format!(
                    "INNER JOIN {location_to_hl} ON location_to_historicallocation.historicallocation_id = historicallocation.id"
                ),
                format!("location_to_historicallocation.location_id = {}", by_id()),
            ),
            (T::HistoricalLocation, T::Thing) => {
                JoinCondition::direct(format!("historicallocation.thing_id = {}", by_id()))
            }
            (T::Datastream, T::Thing) => {
                JoinCondition::direct(format!("datastream.thing_id = {}", by_id()))
            }
            (T::Datastream, T::Sensor) => {
                JoinCondition::direct(format!("datastream.sensor_id = {}", by_id()))
            }
            (T::Datastream, T::ObservedProperty) => {
                JoinCondition::direct(format!("datastream.observedproperty_id = {}", by_id()))
            }
            (T::Datastream, T::Observation) => JoinCondition::direct(format!(
                "datastream.id = {}",
                correlated(by, "stream_id", prefix)
            )),
            (T::Datastream, T::Location) => JoinCondition::linked(
                format!(
                    "INNER JOIN {thing_to_location} ON thing_to_location.thing_id = datastream.thing_id"
                ),
                format!("thing_to_location.location_id = {}", by_id()),
            ),
            (T::Sensor, T::Datastream) => JoinCondition::direct(format!(
                "sensor.id = {}",
                correlated(by, "sensor_id", prefix)
            )),
            (T::ObservedProperty, T::Datastream) => JoinCondition::direct(format!(
                "observedproperty.id = {}",
                correlated(by, "observedproperty_id", prefix)
            )),
            (T::Observation, T::Datastream) => {
                JoinCondition::direct(format!("observation.stream_id = {}", by_id()))
            }
            (T::Observation, T::FeatureOfInterest) => {
                JoinCondition::direct(format!("observation.featureofinterest_id = {}", by_id()))
            }
            (T::FeatureOfInterest, T::Observation) => JoinCondition::direct(format!(
                "featureofinterest.id = {}",
                correlated(by, "featureofinterest_id", prefix)
            )),
            _ => return Resolution::Unknown,
        };
        Resolution::Resolved(join)
    }

    /// Resolves a direct predicate restricting `get` rows to those related
    /// to the `by` entity with the given id, when `get` holds the foreign
    /// key itself.
    pub fn resolve_join_by_id(
        &self,
        get: EntityType,
        by: EntityType,
        id: EntityId,
    ) -> Resolution<String> {
        use EntityType as T;
        let column = match (get, by) {
            (T::HistoricalLocation, T::Thing) => "historicallocation.thing_id",
            (T::Datastream, T::Thing) => "datastream.thing_id",
            (T::Datastream, T::Sensor) => "datastream.sensor_id",
            (T::Datastream, T::ObservedProperty) => "datastream.observedproperty_id",
            (T::Observation, T::Datastream) => "observation.stream_id",
            (T::Observation, T::FeatureOfInterest) => "observation.featureofinterest_id",
            _ => return Resolution::Unknown,
        };
        Resolution::Resolved(format!("{column} = {id}"))
    }
}
