//! Named parameters attached to an observation, and the well-known
//! parameter shapes ingestion consumes.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use super::Quantity;

/// Well-known parameter names.
pub mod names {
    pub const HEIGHT: &str = "height";
    pub const DEPTH: &str = "depth";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const FROM_DEPTH: &str = "fromDepth";
    pub const TO_DEPTH: &str = "toDepth";
    pub const FROM_HEIGHT: &str = "fromHeight";
    pub const TO_HEIGHT: &str = "toHeight";

    pub const HEIGHT_URL: &str = "http://www.opengis.net/def/param-name/OGC-OM/2.0/height";
    pub const DEPTH_URL: &str = "http://www.opengis.net/def/param-name/OGC-OM/2.0/depth";
    pub const SAMPLING_GEOMETRY: &str =
        "http://www.opengis.net/def/param-name/OGC-OM/2.0/samplingGeometry";
}

/// Payload of a named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Quantity(Quantity),
    Count(i64),
    Boolean(bool),
    Category(String),
    Text(String),
    Geometry(Geometry<f64>),
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedParameter {
    pub name: String,
    pub value: ParameterValue,
}

impl NamedParameter {
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self { name: name.into(), value }
    }

    pub fn quantity(name: impl Into<String>, quantity: Quantity) -> Self {
        Self::new(name, ParameterValue::Quantity(quantity))
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match &self.value {
            ParameterValue::Quantity(q) => Some(q),
            _ => None,
        }
    }
}

fn is_height_name(name: &str) -> bool {
    matches!(name, names::HEIGHT | names::FROM_HEIGHT | names::TO_HEIGHT | names::HEIGHT_URL)
}

fn is_depth_name(name: &str) -> bool {
    matches!(name, names::DEPTH | names::FROM_DEPTH | names::TO_DEPTH | names::DEPTH_URL)
}

fn is_from_name(name: &str) -> bool {
    matches!(name, names::FROM | names::FROM_DEPTH | names::FROM_HEIGHT)
}

fn is_to_name(name: &str) -> bool {
    matches!(name, names::TO | names::TO_DEPTH | names::TO_HEIGHT)
}

// ============================================================================
// ParameterHolder
// ============================================================================

/// The parameter bag of one observation.
///
/// Recognized shapes are consumed (removed) by ingestion once translated
/// into vertical metadata or generic parameter rows; whatever is left in
/// the bag after ingestion was never recognized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterHolder {
    parameters: Vec<NamedParameter>,
}

impl ParameterHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parameter: NamedParameter) {
        self.parameters.push(parameter);
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedParameter> {
        self.parameters.iter()
    }

    /// The height/depth parameter, if this observation carries one.
    /// Height and depth are mutually exclusive; the first match wins.
    pub fn height_depth(&self) -> Option<&NamedParameter> {
        self.parameters
            .iter()
            .find(|p| (is_height_name(&p.name) || is_depth_name(&p.name)) && p.as_quantity().is_some())
    }

    pub fn is_depth(parameter: &NamedParameter) -> bool {
        is_depth_name(&parameter.name)
    }

    /// The from/to parameter pair, present only when both ends are.
    pub fn from_to(&self) -> Option<(&NamedParameter, &NamedParameter)> {
        let from = self
            .parameters
            .iter()
            .find(|p| is_from_name(&p.name) && p.as_quantity().is_some())?;
        let to = self
            .parameters
            .iter()
            .find(|p| is_to_name(&p.name) && p.as_quantity().is_some())?;
        Some((from, to))
    }

    /// The spatial filtering parameter's geometry, if present.
    pub fn sampling_geometry(&self) -> Option<&Geometry<f64>> {
        self.parameters.iter().find_map(|p| match (&p.name, &p.value) {
            (name, ParameterValue::Geometry(g)) if name == names::SAMPLING_GEOMETRY => Some(g),
            _ => None,
        })
    }

    /// Drop the spatial filtering parameter once its geometry has been
    /// attached to a storage row.
    pub fn remove_sampling_geometry(&mut self) {
        self.parameters.retain(|p| p.name != names::SAMPLING_GEOMETRY);
    }

    /// Remove and return the first parameter with the given name.
    pub fn remove(&mut self, name: &str) -> Option<NamedParameter> {
        let at = self.parameters.iter().position(|p| p.name == name)?;
        Some(self.parameters.remove(at))
    }

    /// Drain every remaining parameter, leaving the bag empty.
    pub fn drain(&mut self) -> Vec<NamedParameter> {
        std::mem::take(&mut self.parameters)
    }
}
