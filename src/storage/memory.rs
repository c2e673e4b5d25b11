//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageSession`. It uses
//! simple hash tables protected by RwLock, with atomic id counters and
//! natural-key uniqueness on every reference table.
//!
//! ## Limitations
//!
//! - **No real transactions**: `commit()` flushes whatever is still
//!   staged; `rollback()` discards staged rows but does NOT revert rows
//!   that were already flushed, nor reference entities.
//! - **Single-writer only**: per-table locks mean multi-step mutations
//!   are NOT atomic across tables. One session per store at a time.
//!
//! Use this backend for:
//! - Testing the ingestion engine end to end
//! - Embedding the engine in hosts that don't need persistence

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use geo_types::Geometry;
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::entity::{
    CategoryEntity, CategoryId, CodespaceEntity, CodespaceId, DataRow, DatasetEntity, DatasetId,
    FeatureEntity, FeatureId, FormatEntity, FormatId, OfferingEntity, OfferingId, PhenomenonEntity,
    PhenomenonId, PlatformEntity, PlatformId, ProcedureEntity, ProcedureId, RowId, UnitEntity,
    UnitId, VerticalMetadataEntity, VerticalMetadataId,
};
use crate::ingest::ObservationContext;
use crate::model::UoM;
use crate::{Error, Result};

use super::{SessionCounters, StorageSession, TypeCheck};

/// Natural key of a series: procedure × phenomenon × offering × category.
type SeriesKey = (String, String, String, String);

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory observation store.
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    rows: RwLock<HashMap<RowId, DataRow>>,
    datasets: RwLock<HashMap<DatasetId, DatasetEntity>>,
    series_index: RwLock<HashMap<SeriesKey, DatasetId>>,
    units: RwLock<HashMap<String, UnitEntity>>,
    codespaces: RwLock<HashMap<String, CodespaceEntity>>,
    phenomena: RwLock<HashMap<String, PhenomenonEntity>>,
    formats: RwLock<HashMap<String, FormatEntity>>,
    verticals: RwLock<HashMap<String, VerticalMetadataEntity>>,
    platforms: RwLock<HashMap<String, PlatformEntity>>,
    features: RwLock<HashMap<FeatureId, FeatureEntity>>,
    procedures: RwLock<HashMap<String, ProcedureEntity>>,
    offerings: RwLock<HashMap<String, OfferingEntity>>,
    categories: RwLock<HashMap<String, CategoryEntity>>,
    next_row_id: AtomicU64,
    next_dataset_id: AtomicU64,
    next_unit_id: AtomicU64,
    next_codespace_id: AtomicU64,
    next_phenomenon_id: AtomicU64,
    next_format_id: AtomicU64,
    next_vertical_id: AtomicU64,
    next_platform_id: AtomicU64,
    next_feature_id: AtomicU64,
    next_procedure_id: AtomicU64,
    next_offering_id: AtomicU64,
    next_category_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                rows: RwLock::new(HashMap::new()),
                datasets: RwLock::new(HashMap::new()),
                series_index: RwLock::new(HashMap::new()),
                units: RwLock::new(HashMap::new()),
                codespaces: RwLock::new(HashMap::new()),
                phenomena: RwLock::new(HashMap::new()),
                formats: RwLock::new(HashMap::new()),
                verticals: RwLock::new(HashMap::new()),
                platforms: RwLock::new(HashMap::new()),
                features: RwLock::new(HashMap::new()),
                procedures: RwLock::new(HashMap::new()),
                offerings: RwLock::new(HashMap::new()),
                categories: RwLock::new(HashMap::new()),
                next_row_id: AtomicU64::new(1),
                next_dataset_id: AtomicU64::new(1),
                next_unit_id: AtomicU64::new(1),
                next_codespace_id: AtomicU64::new(1),
                next_phenomenon_id: AtomicU64::new(1),
                next_format_id: AtomicU64::new(1),
                next_vertical_id: AtomicU64::new(1),
                next_platform_id: AtomicU64::new(1),
                next_feature_id: AtomicU64::new(1),
                next_procedure_id: AtomicU64::new(1),
                next_offering_id: AtomicU64::new(1),
                next_category_id: AtomicU64::new(1),
            }),
        }
    }

    /// Open a session. The transaction boundary is the caller's: one
    /// session per ingestion tree, never shared.
    pub fn begin(&self) -> MemorySession {
        MemorySession {
            inner: self.inner.clone(),
            staged: Vec::new(),
            counters: SessionCounters::default(),
        }
    }

    // ========================================================================
    // Setup helpers — stand-ins for the external entity DAOs
    // ========================================================================

    pub fn insert_feature(
        &self,
        identifier: &str,
        geometry: Option<Geometry<f64>>,
        geometry_updatable: bool,
    ) -> FeatureEntity {
        let id = FeatureId(self.inner.next_feature_id.fetch_add(1, Ordering::Relaxed));
        let feature = FeatureEntity {
            id,
            identifier: identifier.to_owned(),
            name: None,
            geometry,
            geometry_updatable,
        };
        self.inner.features.write().insert(id, feature.clone());
        feature
    }

    pub fn insert_procedure(&self, identifier: &str) -> ProcedureEntity {
        let mut procedures = self.inner.procedures.write();
        procedures
            .entry(identifier.to_owned())
            .or_insert_with(|| ProcedureEntity {
                id: ProcedureId(self.inner.next_procedure_id.fetch_add(1, Ordering::Relaxed)),
                identifier: identifier.to_owned(),
                name: None,
            })
            .clone()
    }

    pub fn insert_offering(&self, identifier: &str) -> OfferingEntity {
        let mut offerings = self.inner.offerings.write();
        offerings
            .entry(identifier.to_owned())
            .or_insert_with(|| OfferingEntity {
                id: OfferingId(self.inner.next_offering_id.fetch_add(1, Ordering::Relaxed)),
                identifier: identifier.to_owned(),
                name: None,
            })
            .clone()
    }

    pub fn insert_category(&self, identifier: &str) -> CategoryEntity {
        let mut categories = self.inner.categories.write();
        categories
            .entry(identifier.to_owned())
            .or_insert_with(|| CategoryEntity {
                id: CategoryId(self.inner.next_category_id.fetch_add(1, Ordering::Relaxed)),
                identifier: identifier.to_owned(),
                name: None,
            })
            .clone()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn row(&self, id: RowId) -> Option<DataRow> {
        self.inner.rows.read().get(&id).cloned()
    }

    pub fn rows(&self) -> Vec<DataRow> {
        let mut rows: Vec<DataRow> = self.inner.rows.read().values().cloned().collect();
        rows.sort_by_key(|r| r.id);
        rows
    }

    pub fn row_count(&self) -> usize {
        self.inner.rows.read().len()
    }

    pub fn children_of(&self, parent: RowId) -> Vec<DataRow> {
        let mut rows: Vec<DataRow> = self
            .inner
            .rows
            .read()
            .values()
            .filter(|r| r.parent == Some(parent))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        rows
    }

    pub fn dataset(&self, id: DatasetId) -> Option<DatasetEntity> {
        self.inner.datasets.read().get(&id).cloned()
    }

    pub fn dataset_count(&self) -> usize {
        self.inner.datasets.read().len()
    }

    pub fn feature(&self, id: FeatureId) -> Option<FeatureEntity> {
        self.inner.features.read().get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemorySession
// ============================================================================

/// One transactional scope against a [`MemoryStore`].
pub struct MemorySession {
    inner: Arc<StoreInner>,
    /// Saved but not yet flushed rows, in save order.
    staged: Vec<DataRow>,
    counters: SessionCounters,
}

impl MemorySession {
    /// Flush outstanding rows and end the session.
    pub fn commit(mut self) -> Result<()> {
        if !self.staged.is_empty() {
            self.flush()?;
        }
        Ok(())
    }

    /// Discard staged rows and end the session. Rows that were already
    /// flushed are NOT reverted.
    pub fn rollback(mut self) {
        self.staged.clear();
    }

    fn series_key(
        procedure: &ProcedureEntity,
        phenomenon: &PhenomenonEntity,
        offering: &OfferingEntity,
        category: &CategoryEntity,
    ) -> SeriesKey {
        (
            procedure.identifier.clone(),
            phenomenon.identifier.clone(),
            offering.identifier.clone(),
            category.identifier.clone(),
        )
    }
}

impl StorageSession for MemorySession {
    // ========================================================================
    // Reference create-or-fetch
    // ========================================================================

    fn get_or_insert_unit(&mut self, unit: &UoM) -> Result<UnitEntity> {
        self.counters.unit_calls += 1;
        let mut units = self.inner.units.write();
        Ok(units
            .entry(unit.symbol.clone())
            .or_insert_with(|| UnitEntity {
                id: UnitId(self.inner.next_unit_id.fetch_add(1, Ordering::Relaxed)),
                symbol: unit.symbol.clone(),
                name: unit.name.clone(),
                link: unit.link.clone(),
            })
            .clone())
    }

    fn get_or_insert_codespace(&mut self, name: &str) -> Result<CodespaceEntity> {
        self.counters.codespace_calls += 1;
        let mut codespaces = self.inner.codespaces.write();
        Ok(codespaces
            .entry(name.to_owned())
            .or_insert_with(|| CodespaceEntity {
                id: CodespaceId(self.inner.next_codespace_id.fetch_add(1, Ordering::Relaxed)),
                name: name.to_owned(),
            })
            .clone())
    }

    fn get_or_insert_phenomenon(&mut self, identifier: &str) -> Result<PhenomenonEntity> {
        self.counters.phenomenon_calls += 1;
        let mut phenomena = self.inner.phenomena.write();
        Ok(phenomena
            .entry(identifier.to_owned())
            .or_insert_with(|| PhenomenonEntity {
                id: PhenomenonId(self.inner.next_phenomenon_id.fetch_add(1, Ordering::Relaxed)),
                identifier: identifier.to_owned(),
                name: None,
            })
            .clone())
    }

    fn get_or_insert_format(&mut self, format: &str) -> Result<FormatEntity> {
        self.counters.format_calls += 1;
        let mut formats = self.inner.formats.write();
        Ok(formats
            .entry(format.to_owned())
            .or_insert_with(|| FormatEntity {
                id: FormatId(self.inner.next_format_id.fetch_add(1, Ordering::Relaxed)),
                format: format.to_owned(),
            })
            .clone())
    }

    fn get_or_insert_vertical_metadata(
        &mut self,
        metadata: VerticalMetadataEntity,
    ) -> Result<VerticalMetadataEntity> {
        self.counters.vertical_calls += 1;
        let key = metadata.natural_key();
        let mut verticals = self.inner.verticals.write();
        Ok(verticals
            .entry(key)
            .or_insert_with(|| VerticalMetadataEntity {
                id: Some(VerticalMetadataId(
                    self.inner.next_vertical_id.fetch_add(1, Ordering::Relaxed),
                )),
                ..metadata
            })
            .clone())
    }

    fn get_or_insert_platform(&mut self, feature: &FeatureEntity) -> Result<PlatformEntity> {
        self.counters.platform_calls += 1;
        let mut platforms = self.inner.platforms.write();
        Ok(platforms
            .entry(feature.identifier.clone())
            .or_insert_with(|| PlatformEntity {
                id: PlatformId(self.inner.next_platform_id.fetch_add(1, Ordering::Relaxed)),
                identifier: feature.identifier.clone(),
                name: feature.name.clone(),
            })
            .clone())
    }

    // ========================================================================
    // Series
    // ========================================================================

    fn check_or_insert_series(
        &mut self,
        procedure: &ProcedureEntity,
        phenomenon: &PhenomenonEntity,
        offering: &OfferingEntity,
        category: &CategoryEntity,
        _feature: &FeatureEntity,
        platform: Option<&PlatformEntity>,
        hidden: bool,
    ) -> Result<DatasetEntity> {
        self.counters.series_calls += 1;
        let key = Self::series_key(procedure, phenomenon, offering, category);
        if let Some(id) = self.inner.series_index.read().get(&key) {
            return self
                .inner
                .datasets
                .read()
                .get(id)
                .cloned()
                .ok_or_else(|| Error::storage(format!("dangling series index entry {id}")));
        }

        let id = DatasetId(self.inner.next_dataset_id.fetch_add(1, Ordering::Relaxed));
        let dataset = DatasetEntity {
            id,
            procedure: procedure.clone(),
            phenomenon: phenomenon.clone(),
            offering: offering.clone(),
            category: category.clone(),
            platform: platform.cloned(),
            unit: None,
            observation_type: None,
            vertical_metadata: None,
            hidden,
            first: None,
            latest: None,
        };
        self.inner.series_index.write().insert(key, id);
        self.inner.datasets.write().insert(id, dataset.clone());
        debug!(dataset = %id, phenomenon = %phenomenon.identifier, hidden, "series created");
        Ok(dataset)
    }

    fn check_observation_type(
        &mut self,
        dataset: DatasetId,
        format: &FormatEntity,
    ) -> Result<TypeCheck> {
        let mut datasets = self.inner.datasets.write();
        let entry = datasets
            .get_mut(&dataset)
            .ok_or_else(|| Error::storage(format!("dataset {dataset} not found")))?;
        match &entry.observation_type {
            None => {
                entry.observation_type = Some(format.clone());
                debug!(dataset = %dataset, format = %format.format, "observation type pinned");
                Ok(TypeCheck::Compatible(entry.clone()))
            }
            Some(declared) if declared.format == format.format => {
                Ok(TypeCheck::Compatible(entry.clone()))
            }
            Some(declared) => Ok(TypeCheck::Mismatch { expected: declared.format.clone() }),
        }
    }

    fn update_dataset(&mut self, dataset: &DatasetEntity) -> Result<()> {
        let mut datasets = self.inner.datasets.write();
        let entry = datasets
            .get_mut(&dataset.id)
            .ok_or_else(|| Error::storage(format!("dataset {} not found", dataset.id)))?;
        if entry.unit.is_none() {
            entry.unit = dataset.unit.clone();
        }
        if entry.observation_type.is_none() {
            entry.observation_type = dataset.observation_type.clone();
        }
        if entry.vertical_metadata.is_none() {
            entry.vertical_metadata = dataset.vertical_metadata.clone();
        }
        if entry.platform.is_none() {
            entry.platform = dataset.platform.clone();
        }
        Ok(())
    }

    fn update_series_bounds(&mut self, dataset: DatasetId, row: &DataRow) -> Result<()> {
        let id = row
            .id
            .ok_or_else(|| Error::storage("cannot update series bounds from an unsaved row"))?;
        let Some(span) = row.sampling_time else {
            return Ok(());
        };
        let quantity = row.quantity_sample();
        let mut datasets = self.inner.datasets.write();
        let entry = datasets
            .get_mut(&dataset)
            .ok_or_else(|| Error::storage(format!("dataset {dataset} not found")))?;
        if entry.first.is_none_or(|f| span.start < f.at) {
            entry.first =
                Some(crate::entity::ValueSummary { at: span.start, row: id, quantity });
        }
        if entry.latest.is_none_or(|l| span.end >= l.at) {
            entry.latest = Some(crate::entity::ValueSummary { at: span.end, row: id, quantity });
        }
        Ok(())
    }

    // ========================================================================
    // Feature
    // ========================================================================

    fn update_feature_geometry(
        &mut self,
        feature: FeatureId,
        geometry: &Geometry<f64>,
    ) -> Result<()> {
        let mut features = self.inner.features.write();
        let entry = features
            .get_mut(&feature)
            .ok_or_else(|| Error::storage(format!("feature {feature} not found")))?;
        entry.geometry = Some(geometry.clone());
        debug!(feature = %feature, "feature geometry updated");
        Ok(())
    }

    // ========================================================================
    // Rows
    // ========================================================================

    fn apply_context(
        &mut self,
        context: &ObservationContext,
        row: &mut DataRow,
    ) -> Result<DatasetEntity> {
        let procedure = context.procedure.as_ref().ok_or_else(incomplete("procedure"))?;
        let phenomenon = context.phenomenon.as_ref().ok_or_else(incomplete("phenomenon"))?;
        let offering = context.offering.as_ref().ok_or_else(incomplete("offering"))?;
        let category = context.category.as_ref().ok_or_else(incomplete("category"))?;
        let feature = context.feature.as_ref().ok_or_else(incomplete("feature"))?;

        let mut dataset = self.check_or_insert_series(
            procedure,
            phenomenon,
            offering,
            category,
            feature,
            context.platform.as_ref(),
            context.hidden_child,
        )?;

        let mut changed = false;
        if dataset.platform.is_none() && context.platform.is_some() {
            dataset.platform = context.platform.clone();
            changed = true;
        }
        if dataset.unit.is_none() && context.unit.is_some() {
            dataset.unit = context.unit.clone();
            changed = true;
        }
        if dataset.observation_type.is_none() && context.observation_type.is_some() {
            dataset.observation_type = context.observation_type.clone();
            changed = true;
        }
        if dataset.vertical_metadata.is_none() && context.vertical.is_some() {
            dataset.vertical_metadata = context.vertical.clone();
            changed = true;
        }
        if changed {
            self.update_dataset(&dataset)?;
        }

        row.dataset = Some(dataset.id);
        row.hidden_child = context.hidden_child;
        Ok(dataset)
    }

    fn save(&mut self, mut row: DataRow) -> Result<RowId> {
        if let Some(parent) = row.parent {
            if !self.inner.rows.read().contains_key(&parent) {
                return Err(Error::storage(format!(
                    "parent row {parent} is not flushed; flush before creating children"
                )));
            }
        }
        if row.dataset.is_none() {
            return Err(Error::storage("row has no dataset; apply a context before saving"));
        }
        let id = RowId(self.inner.next_row_id.fetch_add(1, Ordering::Relaxed));
        row.id = Some(id);
        self.staged.push(row);
        Ok(id)
    }

    fn flush(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut rows = self.inner.rows.write();
        for row in self.staged.drain(..) {
            let id = row.id.ok_or_else(|| Error::storage("staged row without id"))?;
            debug!(row = %id, kind = %row.kind(), "row flushed");
            rows.insert(id, row);
        }
        Ok(())
    }

    fn refresh(&mut self, id: RowId) -> Result<DataRow> {
        self.inner
            .rows
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::storage(format!("cannot refresh row {id}: not flushed")))
    }

    fn counters(&self) -> SessionCounters {
        self.counters
    }
}

fn incomplete(field: &'static str) -> impl FnOnce() -> Error {
    move || Error::storage(format!("incomplete observation context: missing {field}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Payload;

    fn series(session: &mut MemorySession, store: &MemoryStore) -> DatasetEntity {
        let procedure = store.insert_procedure("proc");
        let phenomenon = session.get_or_insert_phenomenon("temp").unwrap();
        let offering = store.insert_offering("off");
        let category = store.insert_category("default");
        let feature = store.insert_feature("station-1", None, false);
        session
            .check_or_insert_series(
                &procedure, &phenomenon, &offering, &category, &feature, None, false,
            )
            .unwrap()
    }

    #[test]
    fn test_get_or_insert_unit_idempotent() {
        let store = MemoryStore::new();
        let mut session = store.begin();
        let first = session.get_or_insert_unit(&UoM::new("m")).unwrap();
        let second = session.get_or_insert_unit(&UoM::new("m")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(session.counters().unit_calls, 2);
    }

    #[test]
    fn test_series_natural_key_dedup() {
        let store = MemoryStore::new();
        let mut session = store.begin();
        let a = series(&mut session, &store);
        let b = series(&mut session, &store);
        assert_eq!(a.id, b.id);
        assert_eq!(store.dataset_count(), 1);
    }

    #[test]
    fn test_type_check_pins_then_compares() {
        let store = MemoryStore::new();
        let mut session = store.begin();
        let dataset = series(&mut session, &store);
        let measurement = session
            .get_or_insert_format(crate::entity::format::OBS_TYPE_MEASUREMENT)
            .unwrap();
        let count = session
            .get_or_insert_format(crate::entity::format::OBS_TYPE_COUNT_OBSERVATION)
            .unwrap();

        match session.check_observation_type(dataset.id, &measurement).unwrap() {
            TypeCheck::Compatible(d) => {
                assert_eq!(
                    d.observation_type.unwrap().format,
                    crate::entity::format::OBS_TYPE_MEASUREMENT
                );
            }
            TypeCheck::Mismatch { .. } => panic!("first check must pin the type"),
        }
        match session.check_observation_type(dataset.id, &count).unwrap() {
            TypeCheck::Mismatch { expected } => {
                assert_eq!(expected, crate::entity::format::OBS_TYPE_MEASUREMENT);
            }
            TypeCheck::Compatible(_) => panic!("second check must reject a different type"),
        }
    }

    #[test]
    fn test_refresh_requires_flush() {
        let store = MemoryStore::new();
        let mut session = store.begin();
        let dataset = series(&mut session, &store);
        let mut row = DataRow::new(Payload::Count(1));
        row.dataset = Some(dataset.id);
        let id = session.save(row).unwrap();
        assert!(session.refresh(id).is_err());
        session.flush().unwrap();
        assert_eq!(session.refresh(id).unwrap().id, Some(id));
    }

    #[test]
    fn test_child_save_requires_flushed_parent() {
        let store = MemoryStore::new();
        let mut session = store.begin();
        let dataset = series(&mut session, &store);

        let mut parent = DataRow::new(Payload::Complex);
        parent.dataset = Some(dataset.id);
        let parent_id = session.save(parent).unwrap();

        let mut child = DataRow::new(Payload::Count(1));
        child.dataset = Some(dataset.id);
        child.parent = Some(parent_id);
        assert!(session.save(child.clone()).is_err());

        session.flush().unwrap();
        assert!(session.save(child).is_ok());
    }

    #[test]
    fn test_rollback_discards_staged_only() {
        let store = MemoryStore::new();
        let mut session = store.begin();
        let dataset = series(&mut session, &store);

        let mut row = DataRow::new(Payload::Count(1));
        row.dataset = Some(dataset.id);
        session.save(row.clone()).unwrap();
        session.flush().unwrap();

        let mut staged = DataRow::new(Payload::Count(2));
        staged.dataset = Some(dataset.id);
        session.save(staged).unwrap();
        session.rollback();

        assert_eq!(store.row_count(), 1);
    }
}
