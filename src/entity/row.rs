//! The persisted observation row.

use chrono::{DateTime, Utc};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{ParameterValue, TimeSpan};

use super::dataset::DatasetId;
use super::format;
use super::refs::{CodespaceId, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The single populated payload of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Truth(bool),
    Category(String),
    Count(i64),
    Quantity(f64),
    Text(String),
    Geometry(Geometry<f64>),
    Blob(Vec<u8>),
    Reference { href: String, title: Option<String> },
    /// Structured parent; the actual values live in child rows.
    Complex,
    /// Vertically decomposed parent; levels live in child rows.
    Profile,
}

/// Storage kind of a row — one variant per [`Payload`] shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    Truth,
    Category,
    Count,
    Quantity,
    Text,
    Geometry,
    Blob,
    Reference,
    Complex,
    Profile,
}

impl StorageKind {
    /// The observation type URI this storage kind maps to.
    pub fn format_uri(&self) -> &'static str {
        match self {
            StorageKind::Truth => format::OBS_TYPE_TRUTH_OBSERVATION,
            StorageKind::Category => format::OBS_TYPE_CATEGORY_OBSERVATION,
            StorageKind::Count => format::OBS_TYPE_COUNT_OBSERVATION,
            StorageKind::Quantity => format::OBS_TYPE_MEASUREMENT,
            StorageKind::Text => format::OBS_TYPE_TEXT_OBSERVATION,
            StorageKind::Geometry => format::OBS_TYPE_GEOMETRY_OBSERVATION,
            StorageKind::Blob => format::OBS_TYPE_OBSERVATION,
            StorageKind::Reference => format::OBS_TYPE_REFERENCE_OBSERVATION,
            StorageKind::Complex => format::OBS_TYPE_COMPLEX_OBSERVATION,
            StorageKind::Profile => format::OBS_TYPE_PROFILE_OBSERVATION,
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A generic parameter persisted alongside a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    pub name: String,
    pub value: ParameterValue,
    pub unit: Option<UnitId>,
}

// ============================================================================
// DataRow
// ============================================================================

/// One persisted unit of a value.
///
/// Constructed as a draft (no `id`, no `dataset`); both are assigned by
/// the storage session at save time. A refreshed row always has both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub id: Option<RowId>,
    pub dataset: Option<DatasetId>,
    pub parent: Option<RowId>,
    pub deleted: bool,
    pub identifier: Option<String>,
    pub identifier_codespace: Option<CodespaceId>,
    pub name: Option<String>,
    pub name_codespace: Option<CodespaceId>,
    pub description: Option<String>,
    pub sampling_time: Option<TimeSpan>,
    pub result_time: Option<DateTime<Utc>>,
    pub payload: Payload,
    pub sampling_geometry: Option<Geometry<f64>>,
    pub vertical_from: Option<f64>,
    pub vertical_to: Option<f64>,
    pub parameters: SmallVec<[ParameterRow; 2]>,
    /// Set for decomposed children that are not part of a profile series.
    pub hidden_child: bool,
}

impl DataRow {
    pub fn new(payload: Payload) -> Self {
        Self {
            id: None,
            dataset: None,
            parent: None,
            deleted: false,
            identifier: None,
            identifier_codespace: None,
            name: None,
            name_codespace: None,
            description: None,
            sampling_time: None,
            result_time: None,
            payload,
            sampling_geometry: None,
            vertical_from: None,
            vertical_to: None,
            parameters: SmallVec::new(),
            hidden_child: false,
        }
    }

    pub fn kind(&self) -> StorageKind {
        match &self.payload {
            Payload::Truth(_) => StorageKind::Truth,
            Payload::Category(_) => StorageKind::Category,
            Payload::Count(_) => StorageKind::Count,
            Payload::Quantity(_) => StorageKind::Quantity,
            Payload::Text(_) => StorageKind::Text,
            Payload::Geometry(_) => StorageKind::Geometry,
            Payload::Blob(_) => StorageKind::Blob,
            Payload::Reference { .. } => StorageKind::Reference,
            Payload::Complex => StorageKind::Complex,
            Payload::Profile => StorageKind::Profile,
        }
    }

    /// Numeric sample for series summaries; `None` for non-quantity rows.
    pub fn quantity_sample(&self) -> Option<f64> {
        match &self.payload {
            Payload::Quantity(v) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_payload() {
        assert_eq!(DataRow::new(Payload::Truth(true)).kind(), StorageKind::Truth);
        assert_eq!(DataRow::new(Payload::Complex).kind(), StorageKind::Complex);
    }

    #[test]
    fn test_format_uri_mapping() {
        assert_eq!(StorageKind::Quantity.format_uri(), format::OBS_TYPE_MEASUREMENT);
        assert_eq!(StorageKind::Profile.format_uri(), format::OBS_TYPE_PROFILE_OBSERVATION);
        assert_eq!(StorageKind::Blob.format_uri(), format::OBS_TYPE_OBSERVATION);
    }

    #[test]
    fn test_quantity_sample() {
        assert_eq!(DataRow::new(Payload::Quantity(4.2)).quantity_sample(), Some(4.2));
        assert_eq!(DataRow::new(Payload::Count(4)).quantity_sample(), None);
    }
}
