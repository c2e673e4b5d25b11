//! Series identity — the dataset an observation row belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::format::{self, FormatEntity};
use super::refs::{
    CategoryEntity, OfferingEntity, PhenomenonEntity, PlatformEntity, ProcedureEntity, UnitEntity,
    VerticalMetadataEntity,
};
use super::row::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub u64);

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cached summary of one end of a series (first or latest row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueSummary {
    pub at: DateTime<Utc>,
    pub row: RowId,
    /// Numeric sample for quantity payloads, for cheap series previews.
    pub quantity: Option<f64>,
}

/// A series: procedure × phenomenon × offering × category (× platform),
/// carrying the declared observation type and shared unit.
///
/// During one ingestion tree a dataset is mutated only to pin its unit,
/// observation type, or vertical metadata the first time they become
/// known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntity {
    pub id: DatasetId,
    pub procedure: ProcedureEntity,
    pub phenomenon: PhenomenonEntity,
    pub offering: OfferingEntity,
    pub category: CategoryEntity,
    pub platform: Option<PlatformEntity>,
    pub unit: Option<UnitEntity>,
    pub observation_type: Option<FormatEntity>,
    pub vertical_metadata: Option<VerticalMetadataEntity>,
    /// Hidden series carry decomposed children (e.g. complex fields) and
    /// are not listed alongside regular series.
    pub hidden: bool,
    pub first: Option<ValueSummary>,
    pub latest: Option<ValueSummary>,
}

impl DatasetEntity {
    pub fn has_unit(&self) -> bool {
        self.unit.is_some()
    }

    pub fn has_vertical_metadata(&self) -> bool {
        self.vertical_metadata.is_some()
    }

    pub fn is_profile(&self) -> bool {
        self.observation_type
            .as_ref()
            .is_some_and(|t| format::is_profile_type(&t.format))
    }

    pub fn is_data_array(&self) -> bool {
        self.observation_type
            .as_ref()
            .is_some_and(|t| format::is_data_array_type(&t.format))
    }
}
