//! Observation type descriptors (O&M format URIs).

use serde::{Deserialize, Serialize};

pub const OBS_TYPE_MEASUREMENT: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement";
pub const OBS_TYPE_CATEGORY_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_CategoryObservation";
pub const OBS_TYPE_COUNT_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_CountObservation";
pub const OBS_TYPE_TRUTH_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_TruthObservation";
pub const OBS_TYPE_TEXT_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_TextObservation";
pub const OBS_TYPE_GEOMETRY_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_GeometryObservation";
pub const OBS_TYPE_COMPLEX_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_ComplexObservation";
pub const OBS_TYPE_PROFILE_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_ProfileObservation";
pub const OBS_TYPE_REFERENCE_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_ReferenceObservation";
/// Generic fallback type, used for opaque blob results.
pub const OBS_TYPE_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Observation";
pub const OBS_TYPE_SWE_ARRAY_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_SWEArrayObservation";
pub const OBS_TYPE_GEOLOGY_LOG: &str =
    "http://www.opengis.net/def/observationType/gwml/2.1/GW_GeologyLog";
pub const OBS_TYPE_GEOLOGY_LOG_COVERAGE: &str =
    "http://www.opengis.net/def/observationType/gwml/2.1/GW_GeologyLogCoverage";

/// Whether a format URI denotes a vertically decomposed observation type.
pub fn is_profile_type(format: &str) -> bool {
    matches!(
        format,
        OBS_TYPE_PROFILE_OBSERVATION | OBS_TYPE_GEOLOGY_LOG | OBS_TYPE_GEOLOGY_LOG_COVERAGE
    )
}

pub fn is_data_array_type(format: &str) -> bool {
    format == OBS_TYPE_SWE_ARRAY_OBSERVATION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatId(pub u64);

impl std::fmt::Display for FormatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored observation type descriptor. Natural key: `format`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatEntity {
    pub id: FormatId,
    pub format: String,
}
