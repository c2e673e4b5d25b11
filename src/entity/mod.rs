//! # Storage Entities
//!
//! Row shapes and shared reference entities — what actually lands in the
//! relational schema. Like the model DTOs these are pure data; the
//! storage session owns their lifecycle.

pub mod dataset;
pub mod format;
pub mod refs;
pub mod row;

pub use dataset::{DatasetEntity, DatasetId, ValueSummary};
pub use format::{FormatEntity, FormatId};
pub use refs::{
    CategoryEntity, CategoryId, CodespaceEntity, CodespaceId, FeatureEntity, FeatureId,
    OfferingEntity, OfferingId, PhenomenonEntity, PhenomenonId, PlatformEntity, PlatformId,
    ProcedureEntity, ProcedureId, UnitEntity, UnitId, VerticalMetadataEntity, VerticalMetadataId,
};
pub use row::{DataRow, ParameterRow, Payload, RowId, StorageKind};
