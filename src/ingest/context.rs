//! Transient per-row context.

use crate::entity::{
    CategoryEntity, FeatureEntity, FormatEntity, OfferingEntity, PhenomenonEntity, PlatformEntity,
    ProcedureEntity, UnitEntity, VerticalMetadataEntity,
};

/// Aggregates the dataset-derived metadata of one row before it is
/// attached at save time. Created fresh per row, discarded after save.
#[derive(Debug, Clone, Default)]
pub struct ObservationContext {
    pub phenomenon: Option<PhenomenonEntity>,
    pub procedure: Option<ProcedureEntity>,
    pub offering: Option<OfferingEntity>,
    pub category: Option<CategoryEntity>,
    pub platform: Option<PlatformEntity>,
    pub unit: Option<UnitEntity>,
    pub observation_type: Option<FormatEntity>,
    pub vertical: Option<VerticalMetadataEntity>,
    pub feature: Option<FeatureEntity>,
    pub hidden_child: bool,
}

impl ObservationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set_platform(&self) -> bool {
        self.platform.is_some()
    }

    pub fn is_set_vertical(&self) -> bool {
        self.vertical.is_some()
    }
}
