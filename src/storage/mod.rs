//! # Storage Session Contract
//!
//! This is THE contract between the ingestion engine and any relational
//! backend. One session covers one transactional scope; the transaction
//! boundary itself (begin/commit/rollback) is owned by the caller.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference implementation |
//!
//! Every `get_or_insert_*` operation is idempotent given an identical
//! natural key and performs its own storage round trip — per-tree
//! deduplication on top of them is the reference cache's job, not the
//! session's.

pub mod memory;

use geo_types::Geometry;

use crate::entity::{
    CategoryEntity, CodespaceEntity, DataRow, DatasetEntity, DatasetId, FeatureEntity, FeatureId,
    FormatEntity, OfferingEntity, PhenomenonEntity, PlatformEntity, ProcedureEntity, RowId,
    UnitEntity, VerticalMetadataEntity,
};
use crate::ingest::ObservationContext;
use crate::model::UoM;
use crate::Result;

pub use memory::{MemorySession, MemoryStore};

/// Outcome of a dataset/observation-type compatibility check.
///
/// A dataset with no declared type accepts the first row's type and pins
/// it; `Compatible` carries the dataset as it looks after that.
#[derive(Debug, Clone)]
pub enum TypeCheck {
    Compatible(DatasetEntity),
    Mismatch { expected: String },
}

/// Round-trip counters of one session, for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub unit_calls: u64,
    pub codespace_calls: u64,
    pub phenomenon_calls: u64,
    pub format_calls: u64,
    pub vertical_calls: u64,
    pub platform_calls: u64,
    pub series_calls: u64,
}

// ============================================================================
// StorageSession Trait
// ============================================================================

/// The universal storage session contract.
///
/// Synchronous by design: ingestion is a depth-first recursion whose only
/// blocking points are these calls, and child rows cannot exist before
/// their parent's flush has assigned its identifier.
pub trait StorageSession {
    // ========================================================================
    // Reference create-or-fetch
    // ========================================================================

    fn get_or_insert_unit(&mut self, unit: &UoM) -> Result<UnitEntity>;

    fn get_or_insert_codespace(&mut self, name: &str) -> Result<CodespaceEntity>;

    fn get_or_insert_phenomenon(&mut self, identifier: &str) -> Result<PhenomenonEntity>;

    fn get_or_insert_format(&mut self, format: &str) -> Result<FormatEntity>;

    fn get_or_insert_vertical_metadata(
        &mut self,
        metadata: VerticalMetadataEntity,
    ) -> Result<VerticalMetadataEntity>;

    /// Derive (or fetch) the platform standing in for a feature when the
    /// series does not declare one.
    fn get_or_insert_platform(&mut self, feature: &FeatureEntity) -> Result<PlatformEntity>;

    // ========================================================================
    // Series
    // ========================================================================

    /// Fetch or create the series for the given coordinates. `hidden`
    /// applies only on creation.
    #[allow(clippy::too_many_arguments)]
    fn check_or_insert_series(
        &mut self,
        procedure: &ProcedureEntity,
        phenomenon: &PhenomenonEntity,
        offering: &OfferingEntity,
        category: &CategoryEntity,
        feature: &FeatureEntity,
        platform: Option<&PlatformEntity>,
        hidden: bool,
    ) -> Result<DatasetEntity>;

    /// Compare a row's observation type against the dataset's declared
    /// type, pinning the type if the dataset has none yet.
    fn check_observation_type(
        &mut self,
        dataset: DatasetId,
        format: &FormatEntity,
    ) -> Result<TypeCheck>;

    /// Write back set-once fields pinned during ingestion (unit,
    /// observation type, vertical metadata, platform). Fields already set
    /// in storage are never overwritten, and value summaries are not
    /// touched.
    fn update_dataset(&mut self, dataset: &DatasetEntity) -> Result<()>;

    /// Update the dataset's cached first/latest summary from a saved row.
    fn update_series_bounds(&mut self, dataset: DatasetId, row: &DataRow) -> Result<()>;

    // ========================================================================
    // Feature
    // ========================================================================

    fn update_feature_geometry(&mut self, feature: FeatureId, geometry: &Geometry<f64>)
    -> Result<()>;

    // ========================================================================
    // Rows
    // ========================================================================

    /// Resolve the row's owning dataset from the context, assign it (and
    /// the hidden flag) on the row, and return the dataset.
    fn apply_context(
        &mut self,
        context: &ObservationContext,
        row: &mut DataRow,
    ) -> Result<DatasetEntity>;

    /// Stage a row for persistence and assign its identifier. A row
    /// referencing an unflushed parent is refused.
    fn save(&mut self, row: DataRow) -> Result<RowId>;

    /// Materialize every staged row.
    fn flush(&mut self) -> Result<()>;

    /// Read back a flushed row, including storage-assigned fields.
    fn refresh(&mut self, id: RowId) -> Result<DataRow>;

    // ========================================================================
    // Introspection
    // ========================================================================

    fn counters(&self) -> SessionCounters;
}
