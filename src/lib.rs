//! # obs-series-rs — Observation Series Storage Engine
//!
//! Maps decoded O&M observation value trees into a normalized, relational
//! storage representation.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageSession` is the contract between the
//!    ingestion engine and storage
//! 2. **Clean DTOs**: `Observation`, `Value`, `DataRow` cross all
//!    boundaries
//! 3. **Closed kind set**: value dispatch is an exhaustive match — adding
//!    a kind forces every dispatch site to be updated
//! 4. **Explicit recursion state**: child persistence carries a context
//!    value (dataset, feature, parent id), never hidden shared state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use obs_series_rs::{Ingester, IngesterConfig, MemoryStore, StorageSession};
//! use obs_series_rs::model::{Observation, Quantity, TimeSpan, UoM};
//!
//! # fn example() -> obs_series_rs::Result<()> {
//! let store = MemoryStore::new();
//! let feature = store.insert_feature("station-1", None, false);
//! let procedure = store.insert_procedure("thermometer-4");
//! let offering = store.insert_offering("offering-1");
//! let category = store.insert_category("default");
//!
//! let mut session = store.begin();
//! let phenomenon = session.get_or_insert_phenomenon("air-temperature")?;
//! let dataset = session.check_or_insert_series(
//!     &procedure, &phenomenon, &offering, &category, &feature, None, false,
//! )?;
//!
//! let at = chrono::Utc::now();
//! let observation = Observation::new(
//!     TimeSpan::instant(at),
//!     Quantity::new(21.5).with_unit(UoM::new("degC")),
//! );
//!
//! let ingester = Ingester::new(IngesterConfig::default());
//! let outcome = ingester.ingest(&mut session, dataset, feature, observation)?;
//! println!("persisted row {:?}", outcome.row.id);
//! session.commit()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! Wire decoding, request routing, spatial query evaluation, and
//! connection lifecycle are the host's concern. This crate starts at a
//! decoded value tree and an open session, and ends at flushed rows.

// ============================================================================
// Modules
// ============================================================================

pub mod entity;
pub mod geom;
pub mod ident;
pub mod ingest;
pub mod model;
pub mod storage;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    CodedName, NamedParameter, Observation, ParameterHolder, ParameterValue, Quantity, TimeSpan,
    UoM, Value, ValueKind,
};

// ============================================================================
// Re-exports: Entities
// ============================================================================

pub use entity::{
    DataRow, DatasetEntity, DatasetId, FeatureEntity, FeatureId, Payload, RowId, StorageKind,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{MemorySession, MemoryStore, SessionCounters, StorageSession, TypeCheck};

// ============================================================================
// Re-exports: Collaborators
// ============================================================================

pub use geom::{AxisOrder, GeometryNormalizer, NormalizerConfig};
pub use ident::IdGenerator;
pub use ingest::{ObservationContext, RefCaches, RowFactory};

use entity::OfferingEntity;
use ingest::{Frame, Persister};
use tracing::debug;

// ============================================================================
// Top-level Ingester handle
// ============================================================================

/// Configuration for an [`Ingester`].
#[derive(Debug, Clone)]
pub struct IngesterConfig {
    pub normalizer: NormalizerConfig,
    /// Prefix of generated observation identifiers.
    pub identifier_prefix: String,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self { normalizer: NormalizerConfig::default(), identifier_prefix: "obs_".into() }
    }
}

/// Result of one top-level ingestion: the persisted root row plus the
/// offerings the tree touched (for caller-side cache invalidation).
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub row: DataRow,
    pub offerings: Vec<OfferingEntity>,
}

/// The primary entry point. An `Ingester` owns the injected collaborators
/// (row factory, geometry normalizer, identifier generator) and runs one
/// ingestion tree per [`ingest`](Ingester::ingest) call.
pub struct Ingester {
    factory: RowFactory,
    normalizer: GeometryNormalizer,
    id_gen: IdGenerator,
}

impl Ingester {
    pub fn new(config: IngesterConfig) -> Self {
        Self {
            factory: RowFactory,
            normalizer: GeometryNormalizer::new(config.normalizer),
            id_gen: IdGenerator::new(config.identifier_prefix),
        }
    }

    /// Construct from explicit collaborator values.
    pub fn with_parts(
        factory: RowFactory,
        normalizer: GeometryNormalizer,
        id_gen: IdGenerator,
    ) -> Self {
        Self { factory, normalizer, id_gen }
    }

    /// Persist one decoded observation tree.
    ///
    /// All-or-nothing: any failure surfaces to the caller, whose
    /// transaction boundary decides what rolls back. Reference caches
    /// live exactly as long as this call. The passed dataset is
    /// re-resolved to its current stored state first, so callers may hand
    /// in snapshots from earlier requests.
    pub fn ingest<S: StorageSession>(
        &self,
        session: &mut S,
        dataset: DatasetEntity,
        feature: FeatureEntity,
        observation: Observation,
    ) -> Result<IngestOutcome> {
        debug!(
            dataset = %dataset.id,
            feature = %feature.identifier,
            kind = %observation.value.kind(),
            "ingesting observation"
        );
        let dataset = session.check_or_insert_series(
            &dataset.procedure,
            &dataset.phenomenon,
            &dataset.offering,
            &dataset.category,
            &feature,
            dataset.platform.as_ref(),
            dataset.hidden,
        )?;
        let mut caches = RefCaches::new();
        let mut offerings = Vec::new();
        let mut frame = Frame::root(observation, dataset, feature, &self.normalizer);
        let row = Persister::new(
            session,
            &mut caches,
            &self.factory,
            &self.normalizer,
            &self.id_gen,
            &mut offerings,
        )
        .persist_value(&mut frame)?;
        Ok(IngestOutcome { row, offerings })
    }
}

impl Default for Ingester {
    fn default() -> Self {
        Self::new(IngesterConfig::default())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported observation value kind {0}")]
    UnsupportedValueKind(ValueKind),

    #[error("invalid parameter value for '{parameter}': {message}")]
    InvalidParameterValue { parameter: String, message: String },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl Error {
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    pub(crate) fn observation_type_mismatch(
        dataset: &DatasetEntity,
        requested: &str,
        expected: &str,
    ) -> Self {
        Error::InvalidParameterValue {
            parameter: "observationType".into(),
            message: format!(
                "the requested observationType ({requested}) is invalid for procedure = {}, \
                 observedProperty = {} and offering = {}; the valid observationType is '{expected}'",
                dataset.procedure.identifier,
                dataset.phenomenon.identifier,
                dataset.offering.identifier,
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
