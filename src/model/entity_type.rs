//! Entity type tags and their static naming rules.

use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Every entity kind the catalog knows about.
///
/// The two link variants back many-to-many relations and never appear as
/// request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    /// A physical or virtual object.
    Thing,
    /// Last known location of a Thing.
    Location,
    /// Time-stamped link between a Thing and its Locations.
    HistoricalLocation,
    /// Instrument producing observations.
    Sensor,
    /// Phenomenon being observed.
    ObservedProperty,
    /// Grouping of observations of one property by one sensor.
    Datastream,
    /// A single measured value.
    Observation,
    /// Feature an observation was made about.
    FeatureOfInterest,
    /// Link table between Things and Locations.
    ThingToLocation,
    /// Link table between Locations and HistoricalLocations.
    LocationToHistoricalLocation,
}

impl EntityType {
    /// The eight entity types that can be requested and returned.
    pub const PUBLIC: [EntityType; 8] = [
        EntityType::Thing,
        EntityType::Location,
        EntityType::HistoricalLocation,
        EntityType::Sensor,
        EntityType::ObservedProperty,
        EntityType::Datastream,
        EntityType::Observation,
        EntityType::FeatureOfInterest,
    ];

    /// Unqualified backing table name.
    pub fn table(self) -> &'static str {
        match self {
            EntityType::Thing => "thing",
            EntityType::Location => "location",
            EntityType::HistoricalLocation => "historicallocation",
            EntityType::Sensor => "sensor",
            EntityType::ObservedProperty => "observedproperty",
            EntityType::Datastream => "datastream",
            EntityType::Observation => "observation",
            EntityType::FeatureOfInterest => "featureofinterest",
            EntityType::ThingToLocation => "thing_to_location",
            EntityType::LocationToHistoricalLocation => "location_to_historicallocation",
        }
    }

    /// Singular name, as used for singleton navigation properties.
    pub fn name(self) -> &'static str {
        match self {
            EntityType::Thing => "Thing",
            EntityType::Location => "Location",
            EntityType::HistoricalLocation => "HistoricalLocation",
            EntityType::Sensor => "Sensor",
            EntityType::ObservedProperty => "ObservedProperty",
            EntityType::Datastream => "Datastream",
            EntityType::Observation => "Observation",
            EntityType::FeatureOfInterest => "FeatureOfInterest",
            EntityType::ThingToLocation => "ThingToLocation",
            EntityType::LocationToHistoricalLocation => "LocationToHistoricalLocation",
        }
    }

    /// Plural entity-set name.
    pub fn set_name(self) -> &'static str {
        match self {
            EntityType::Thing => "Things",
            EntityType::Location => "Locations",
            EntityType::HistoricalLocation => "HistoricalLocations",
            EntityType::Sensor => "Sensors",
            EntityType::ObservedProperty => "ObservedProperties",
            EntityType::Datastream => "Datastreams",
            EntityType::Observation => "Observations",
            EntityType::FeatureOfInterest => "FeaturesOfInterest",
            EntityType::ThingToLocation => "ThingToLocations",
            EntityType::LocationToHistoricalLocation => "LocationToHistoricalLocations",
        }
    }

    /// Declared logical property names, `id` first.
    pub fn property_names(self) -> &'static [&'static str] {
        match self {
            EntityType::Thing => &["id", "name", "description", "properties"],
            EntityType::Location => &["id", "name", "description", "encodingType", "location"],
            EntityType::HistoricalLocation => &["id", "time"],
            EntityType::Sensor => &["id", "name", "description", "encodingType", "metadata"],
            EntityType::ObservedProperty => &["id", "name", "definition", "description"],
            EntityType::Datastream => &[
                "id",
                "name",
                "description",
                "unitOfMeasurement",
                "observationType",
                "observedArea",
                "phenomenonTime",
                "resultTime",
            ],
            EntityType::Observation => &[
                "id",
                "phenomenonTime",
                "result",
                "resultTime",
                "resultQuality",
                "validTime",
                "parameters",
            ],
            EntityType::FeatureOfInterest => {
                &["id", "name", "description", "encodingType", "feature"]
            }
            EntityType::ThingToLocation | EntityType::LocationToHistoricalLocation => &[],
        }
    }

    /// Returns true for the internal link-table variants.
    pub fn is_link(self) -> bool {
        matches!(
            self,
            EntityType::ThingToLocation | EntityType::LocationToHistoricalLocation
        )
    }

    /// Looks up an entity type by singular or plural name, ignoring case.
    pub fn from_name(name: &str) -> Option<EntityType> {
        EntityType::PUBLIC.into_iter().find(|et| {
            et.name().eq_ignore_ascii_case(name) || et.set_name().eq_ignore_ascii_case(name)
        })
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::from_name(s).ok_or_else(|| QueryError::UnknownEntitySet { name: s.to_owned() })
    }
}
