//! Observation result types — the closed set of value kinds an
//! observation can carry.

use std::fmt;

use chrono::{DateTime, Utc};
use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};

use super::TimeSpan;

/// Unit of measure, keyed by its symbol.
///
/// Equality and hashing consider the symbol only — `name` and `link` are
/// presentation extras that must not split cache entries for one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UoM {
    pub symbol: String,
    pub name: Option<String>,
    pub link: Option<String>,
}

impl UoM {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), name: None, link: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl PartialEq for UoM {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for UoM {}

impl std::hash::Hash for UoM {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl fmt::Display for UoM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A numeric value with optional unit and semantic definition.
///
/// Also used for profile level boundaries, where `definition` names the
/// vertical axis reference (e.g. a `from`/`to` or `depth` parameter name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<UoM>,
    pub definition: Option<String>,
}

impl Quantity {
    pub fn new(value: f64) -> Self {
        Self { value, unit: None, definition: None }
    }

    pub fn with_unit(mut self, unit: UoM) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

/// A coded category value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub value: String,
    pub unit: Option<UoM>,
}

impl CategoryValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), unit: None }
    }

    pub fn with_unit(mut self, unit: UoM) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// An external reference result (href + optional title).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValue {
    pub href: String,
    pub title: Option<String>,
}

impl ReferenceValue {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into(), title: None }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// One named field of a complex (record) result. `definition` identifies
/// the observable property the field's value belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweField {
    pub name: String,
    pub definition: String,
    pub value: Value,
}

impl SweField {
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self { name: name.into(), definition: definition.into(), value: value.into() }
    }
}

/// A vertically resolved result: ordered levels along a depth/height axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileValue {
    /// Upper bound of the whole profile, if declared.
    pub from_level: Option<Quantity>,
    /// Lower bound of the whole profile, if declared.
    pub to_level: Option<Quantity>,
    /// Profile-own location. Takes precedence over the spatial filtering
    /// parameter as the sampling geometry.
    pub geometry: Option<Geometry<f64>>,
    /// Overrides the observation's phenomenon time when present.
    pub phenomenon_time: Option<TimeSpan>,
    pub levels: Vec<ProfileLevel>,
}

/// One level of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileLevel {
    pub start: Option<Quantity>,
    pub end: Option<Quantity>,
    pub location: Option<Geometry<f64>>,
    pub phenomenon_time: Option<TimeSpan>,
    pub values: Vec<Value>,
}

// ============================================================================
// Value
// ============================================================================

/// The decoded observation result.
///
/// Closed kind set: the first ten variants have a storage mapping, the
/// remainder are recognized on the wire but always rejected by ingestion.
/// Adding a kind means extending this enum, which forces every dispatch
/// site to be updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Boolean(bool),
    Category(CategoryValue),
    Count(i64),
    Geometry(Geometry<f64>),
    Quantity(Quantity),
    Text(String),
    Blob(Vec<u8>),
    Complex(Vec<SweField>),
    Profile(ProfileValue),
    Reference(ReferenceValue),

    // Recognized, never persisted
    DataArray { element_type: Vec<String>, blocks: Vec<Vec<String>> },
    HrefAttribute(String),
    NilTemplate,
    TimeValuePairs(Vec<(DateTime<Utc>, f64)>),
    TimeLocationValueTriples(Vec<(DateTime<Utc>, Point<f64>, f64)>),
    DiscretePointCoverage(Vec<(Point<f64>, f64)>),
    MultiPointCoverage(Vec<(Point<f64>, f64)>),
    RectifiedGridCoverage(Vec<(f64, f64)>),
    RawXml(String),
    TimeRange(TimeSpan),
    QuantityRange { lower: f64, upper: f64, unit: Option<UoM> },
}

/// Discriminant of [`Value`], used for error messages and kind checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    Category,
    Count,
    Geometry,
    Quantity,
    Text,
    Blob,
    Complex,
    Profile,
    Reference,
    DataArray,
    HrefAttribute,
    NilTemplate,
    TimeValuePair,
    TimeLocationValueTriple,
    DiscretePointCoverage,
    MultiPointCoverage,
    RectifiedGridCoverage,
    RawXml,
    TimeRange,
    QuantityRange,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Category(_) => ValueKind::Category,
            Value::Count(_) => ValueKind::Count,
            Value::Geometry(_) => ValueKind::Geometry,
            Value::Quantity(_) => ValueKind::Quantity,
            Value::Text(_) => ValueKind::Text,
            Value::Blob(_) => ValueKind::Blob,
            Value::Complex(_) => ValueKind::Complex,
            Value::Profile(_) => ValueKind::Profile,
            Value::Reference(_) => ValueKind::Reference,
            Value::DataArray { .. } => ValueKind::DataArray,
            Value::HrefAttribute(_) => ValueKind::HrefAttribute,
            Value::NilTemplate => ValueKind::NilTemplate,
            Value::TimeValuePairs(_) => ValueKind::TimeValuePair,
            Value::TimeLocationValueTriples(_) => ValueKind::TimeLocationValueTriple,
            Value::DiscretePointCoverage(_) => ValueKind::DiscretePointCoverage,
            Value::MultiPointCoverage(_) => ValueKind::MultiPointCoverage,
            Value::RectifiedGridCoverage(_) => ValueKind::RectifiedGridCoverage,
            Value::RawXml(_) => ValueKind::RawXml,
            Value::TimeRange(_) => ValueKind::TimeRange,
            Value::QuantityRange { .. } => ValueKind::QuantityRange,
        }
    }

    /// The unit carried by this value, for unit-bearing kinds.
    pub fn unit(&self) -> Option<&UoM> {
        match self {
            Value::Quantity(q) => q.unit.as_ref(),
            Value::Category(c) => c.unit.as_ref(),
            _ => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.kind().is_supported()
    }
}

impl ValueKind {
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            ValueKind::Boolean
                | ValueKind::Category
                | ValueKind::Count
                | ValueKind::Geometry
                | ValueKind::Quantity
                | ValueKind::Text
                | ValueKind::Blob
                | ValueKind::Complex
                | ValueKind::Profile
                | ValueKind::Reference
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "Boolean",
            ValueKind::Category => "Category",
            ValueKind::Count => "Count",
            ValueKind::Geometry => "Geometry",
            ValueKind::Quantity => "Quantity",
            ValueKind::Text => "Text",
            ValueKind::Blob => "Blob",
            ValueKind::Complex => "Complex",
            ValueKind::Profile => "Profile",
            ValueKind::Reference => "Reference",
            ValueKind::DataArray => "DataArray",
            ValueKind::HrefAttribute => "HrefAttribute",
            ValueKind::NilTemplate => "NilTemplate",
            ValueKind::TimeValuePair => "TimeValuePair",
            ValueKind::TimeLocationValueTriple => "TimeLocationValueTriple",
            ValueKind::DiscretePointCoverage => "DiscretePointCoverage",
            ValueKind::MultiPointCoverage => "MultiPointCoverage",
            ValueKind::RectifiedGridCoverage => "RectifiedGridCoverage",
            ValueKind::RawXml => "RawXml",
            ValueKind::TimeRange => "TimeRange",
            ValueKind::QuantityRange => "QuantityRange",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Boolean(v) }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Count(v) }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Quantity(Quantity::new(v)) }
}
impl From<Quantity> for Value {
    fn from(v: Quantity) -> Self { Value::Quantity(v) }
}
impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_owned()) }
}
