//! Integer code tables for encoding types and observation types.
//!
//! Both are persisted as small integers; requests and responses carry the
//! textual form.

/// Prefix shared by every observation type URI.
pub const OBSERVATION_TYPE_PREFIX: &str = "http://www.opengis.net/def/observationType/OGC-OM/2.0/";

/// Supported encoding types, indexed by their stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingType {
    /// Code 0.
    Unknown,
    /// Code 1.
    GeoJson,
    /// Code 2.
    Pdf,
    /// Code 3.
    SensorMl,
}

impl EncodingType {
    /// All encodings in code order.
    pub const ALL: [EncodingType; 4] = [
        EncodingType::Unknown,
        EncodingType::GeoJson,
        EncodingType::Pdf,
        EncodingType::SensorMl,
    ];

    /// Stored integer code.
    pub fn code(self) -> i64 {
        match self {
            EncodingType::Unknown => 0,
            EncodingType::GeoJson => 1,
            EncodingType::Pdf => 2,
            EncodingType::SensorMl => 3,
        }
    }

    /// Media type or URI as exchanged with clients.
    pub fn value(self) -> &'static str {
        match self {
            EncodingType::Unknown => "unknown",
            EncodingType::GeoJson => "application/vnd.geo+json",
            EncodingType::Pdf => "application/pdf",
            EncodingType::SensorMl => "http://www.opengis.net/doc/IS/SensorML/2.0",
        }
    }

    /// Looks up an encoding by its textual value.
    pub fn from_value(value: &str) -> Option<EncodingType> {
        Self::ALL.into_iter().find(|e| e.value() == value)
    }

    /// Looks up an encoding by its stored code.
    pub fn from_code(code: i64) -> Option<EncodingType> {
        Self::ALL.into_iter().find(|e| e.code() == code)
    }
}

/// Supported O&M observation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationType {
    /// IRI valued results.
    Category,
    /// Integer valued results.
    Count,
    /// Double valued results.
    Measurement,
    /// Any result.
    Observation,
    /// Boolean valued results.
    Truth,
}

impl ObservationType {
    /// All observation types in code order.
    pub const ALL: [ObservationType; 5] = [
        ObservationType::Category,
        ObservationType::Count,
        ObservationType::Measurement,
        ObservationType::Observation,
        ObservationType::Truth,
    ];

    /// Stored integer code (1-based).
    pub fn code(self) -> i64 {
        match self {
            ObservationType::Category => 1,
            ObservationType::Count => 2,
            ObservationType::Measurement => 3,
            ObservationType::Observation => 4,
            ObservationType::Truth => 5,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ObservationType::Category => "OM_CategoryObservation",
            ObservationType::Count => "OM_CountObservation",
            ObservationType::Measurement => "OM_Measurement",
            ObservationType::Observation => "OM_Observation",
            ObservationType::Truth => "OM_TruthObservation",
        }
    }

    /// Full observation type URI.
    pub fn uri(self) -> String {
        format!("{OBSERVATION_TYPE_PREFIX}{}", self.suffix())
    }

    /// Looks up an observation type by its URI.
    pub fn from_uri(uri: &str) -> Option<ObservationType> {
        let suffix = uri.strip_prefix(OBSERVATION_TYPE_PREFIX)?;
        Self::ALL.into_iter().find(|t| t.suffix() == suffix)
    }

    /// Looks up an observation type by its stored code.
    pub fn from_code(code: i64) -> Option<ObservationType> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}
