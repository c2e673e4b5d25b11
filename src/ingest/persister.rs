//! The persistence core: value dispatch, the per-row state machine, and
//! recursive decomposition of complex and profile values.
//!
//! Every row walks Draft → Identified → Valued → Contextualized → Saved →
//! Refreshed inside one storage session. Composite values recurse with a
//! child [`Frame`] carrying the parent's generated row id — a parent is
//! always flushed before any child referencing it is constructed, because
//! children link by numeric id, not by object reference.

use geo_types::Geometry;
use smallvec::SmallVec;
use tracing::debug;

use crate::entity::{DataRow, DatasetEntity, FeatureEntity, OfferingEntity, RowId};
use crate::geom::GeometryNormalizer;
use crate::ident::IdGenerator;
use crate::model::{
    NamedParameter, Observation, ProfileLevel, ProfileValue, Quantity, SweField, UoM, Value, names,
};
use crate::storage::{StorageSession, TypeCheck};
use crate::{Error, Result};

use super::caches::RefCaches;
use super::context::ObservationContext;
use super::factory::RowFactory;
use super::guard;

// ============================================================================
// Frame
// ============================================================================

/// Per-node ingestion context, passed down the recursion. Children share
/// the session and caches through the persister; everything node-specific
/// lives here.
#[derive(Debug, Clone)]
pub struct Frame {
    pub observation: Observation,
    pub dataset: DatasetEntity,
    pub feature: FeatureEntity,
    pub sampling_geometry: Option<Geometry<f64>>,
    pub parent: Option<RowId>,
}

impl Frame {
    /// Root frame for one top-level observation. Derives the sampling
    /// geometry: a profile's own geometry wins over the spatial filtering
    /// parameter.
    pub fn root(
        observation: Observation,
        dataset: DatasetEntity,
        feature: FeatureEntity,
        normalizer: &GeometryNormalizer,
    ) -> Self {
        let sampling_geometry = match &observation.value {
            Value::Profile(profile) if profile.geometry.is_some() => {
                profile.geometry.clone().map(|g| normalizer.normalize(g))
            }
            _ => observation
                .parameters
                .sampling_geometry()
                .cloned()
                .map(|g| normalizer.normalize(g)),
        };
        Self { observation, dataset, feature, sampling_geometry, parent: None }
    }

    fn child(&self, observation: Observation, parent: RowId) -> Self {
        Self {
            observation,
            dataset: self.dataset.clone(),
            feature: self.feature.clone(),
            sampling_geometry: self.sampling_geometry.clone(),
            parent: Some(parent),
        }
    }
}

// ============================================================================
// Persister
// ============================================================================

/// Drives one ingestion tree. Holds the shared mutable state of the tree
/// (session, caches, offering collection); node state travels in
/// [`Frame`]s.
pub struct Persister<'a, S: StorageSession> {
    session: &'a mut S,
    caches: &'a mut RefCaches,
    factory: &'a RowFactory,
    normalizer: &'a GeometryNormalizer,
    id_gen: &'a IdGenerator,
    offerings: &'a mut Vec<OfferingEntity>,
}

impl<'a, S: StorageSession> Persister<'a, S> {
    pub fn new(
        session: &'a mut S,
        caches: &'a mut RefCaches,
        factory: &'a RowFactory,
        normalizer: &'a GeometryNormalizer,
        id_gen: &'a IdGenerator,
        offerings: &'a mut Vec<OfferingEntity>,
    ) -> Self {
        Self { session, caches, factory, normalizer, id_gen, offerings }
    }

    // ========================================================================
    // Value dispatch
    // ========================================================================

    /// Map the frame's value to a storage row and persist it (and, for
    /// composite kinds, its children).
    pub fn persist_value(&mut self, frame: &mut Frame) -> Result<DataRow> {
        let value = frame.observation.value.clone();
        match value {
            Value::Boolean(v) => self.unit_and_persist(frame, self.factory.truth(v), None),
            Value::Category(c) => {
                let row = self.factory.category(c.value.clone());
                self.unit_and_persist(frame, row, c.unit.as_ref())
            }
            Value::Count(v) => self.unit_and_persist(frame, self.factory.count(v), None),
            Value::Quantity(q) => {
                let row = self.factory.numeric(q.value);
                self.unit_and_persist(frame, row, q.unit.as_ref())
            }
            Value::Text(v) => {
                let row = self.factory.text(v);
                self.unit_and_persist(frame, row, None)
            }
            Value::Blob(bytes) => {
                let row = self.factory.blob(bytes);
                self.unit_and_persist(frame, row, None)
            }
            Value::Geometry(g) => {
                let row = self.factory.geometry(self.normalizer.normalize(g));
                self.persist(frame, row)
            }
            Value::Reference(r) => {
                let row = self.factory.reference(r.href, r.title);
                self.persist(frame, row)
            }
            Value::Complex(fields) => self.persist_complex(frame, fields),
            Value::Profile(profile) => self.persist_profile(frame, profile),
            unsupported => Err(Error::UnsupportedValueKind(unsupported.kind())),
        }
    }

    /// Pin the dataset's unit from the value on first contact, then
    /// persist.
    fn unit_and_persist(
        &mut self,
        frame: &mut Frame,
        row: DataRow,
        unit: Option<&UoM>,
    ) -> Result<DataRow> {
        if !frame.dataset.has_unit()
            && let Some(unit) = unit
        {
            frame.dataset.unit = Some(self.caches.unit(unit, self.session)?);
            self.session.update_dataset(&frame.dataset)?;
        }
        self.persist(frame, row)
    }

    // ========================================================================
    // Hierarchy: complex
    // ========================================================================

    /// Persist the complex parent row, then one child row per named
    /// field, each against its own (hidden) per-field series.
    fn persist_complex(&mut self, frame: &mut Frame, fields: Vec<SweField>) -> Result<DataRow> {
        let parent_row = self.persist(frame, self.factory.complex())?;
        let parent_id = saved_id(&parent_row)?;

        let mut children: SmallVec<[RowId; 4]> = SmallVec::new();
        for field in &fields {
            let phenomenon = self.session.get_or_insert_phenomenon(&field.definition)?;
            let dataset = self.session.check_or_insert_series(
                &frame.dataset.procedure,
                &phenomenon,
                &frame.dataset.offering,
                &frame.dataset.category,
                &frame.feature,
                frame.dataset.platform.as_ref(),
                true,
            )?;
            let mut observation = frame.observation.clone();
            observation.value = field.value.clone();
            let mut child = Frame { dataset, ..frame.child(observation, parent_id) };
            let row = self.persist_value(&mut child)?;
            children.push(saved_id(&row)?);
        }
        self.session.flush()?;
        debug!(parent = %parent_id, children = children.len(), "complex value decomposed");
        Ok(parent_row)
    }

    // ========================================================================
    // Hierarchy: profile
    // ========================================================================

    /// Persist the profile parent row, then one derived child per level
    /// value. Only single-phenomenon profiles are decomposed; levels are
    /// persisted against the profile's own series.
    fn persist_profile(&mut self, frame: &mut Frame, profile: ProfileValue) -> Result<DataRow> {
        let mut row = self.factory.profile();
        self.merge_profile_bounds(frame, &profile, &mut row)?;
        if let Some(time) = &profile.phenomenon_time {
            frame.observation.phenomenon_time = *time;
        }

        let parent_row = self.persist(frame, row)?;
        let parent_id = saved_id(&parent_row)?;

        let mut count = 0usize;
        for level in &profile.levels {
            if level.values.is_empty() {
                continue;
            }
            let level_observation = observation_with_level_parameters(&frame.observation, level);
            let level_geometry =
                level.location.clone().map(|g| self.normalizer.normalize(g));
            for value in &level.values {
                let mut observation = level_observation.clone();
                observation.value = value.clone();
                let mut child = Frame {
                    sampling_geometry: level_geometry.clone(),
                    ..frame.child(observation, parent_id)
                };
                self.persist_value(&mut child)?;
                count += 1;
            }
        }
        self.session.flush()?;
        debug!(parent = %parent_id, children = count, "profile value decomposed");
        Ok(parent_row)
    }

    /// Copy profile-wide vertical bounds onto the parent row and pin the
    /// derived descriptor on the dataset (create-once).
    fn merge_profile_bounds(
        &mut self,
        frame: &mut Frame,
        profile: &ProfileValue,
        row: &mut DataRow,
    ) -> Result<()> {
        if profile.from_level.is_none() && profile.to_level.is_none() {
            return Ok(());
        }
        let mut metadata = crate::entity::VerticalMetadataEntity::default();
        if let Some(from) = &profile.from_level {
            row.vertical_from = Some(from.value);
            metadata.from_name = from.definition.clone();
            if let Some(unit) = &from.unit {
                metadata.unit = Some(self.caches.unit(unit, self.session)?);
            }
        }
        if let Some(to) = &profile.to_level {
            row.vertical_to = Some(to.value);
            metadata.to_name = to.definition.clone();
            if let Some(unit) = &to.unit {
                metadata.unit = Some(self.caches.unit(unit, self.session)?);
            }
        }
        if !frame.dataset.has_vertical_metadata() {
            let stored = self.session.get_or_insert_vertical_metadata(metadata)?;
            frame.dataset.vertical_metadata = Some(stored);
            self.session.update_dataset(&frame.dataset)?;
        }
        Ok(())
    }

    // ========================================================================
    // Row state machine
    // ========================================================================

    fn persist(&mut self, frame: &mut Frame, mut row: DataRow) -> Result<DataRow> {
        // Draft
        row.deleted = false;

        // Identified
        match frame.parent {
            Some(parent) => row.parent = Some(parent),
            None => self.add_identifier(frame, &mut row)?,
        }
        self.add_name(frame, &mut row)?;
        row.description = frame.observation.description.clone();
        row.sampling_time = Some(frame.observation.phenomenon_time);
        row.result_time = frame.observation.result_time;

        // Valued
        if let Some(geometry) = frame.sampling_geometry.clone() {
            row.sampling_geometry = Some(geometry.clone());
            if guard::should_update_feature_geometry(&frame.feature, frame.parent) {
                self.session.update_feature_geometry(frame.feature.id, &geometry)?;
            }
            frame.observation.parameters.remove_sampling_geometry();
        }

        // Contextualized
        let format = self.session.get_or_insert_format(row.kind().format_uri())?;
        if guard::requires_type_check(&frame.dataset, frame.parent) {
            self.collect_offering(&frame.dataset.offering);
            match self.session.check_observation_type(frame.dataset.id, &format)? {
                TypeCheck::Compatible(updated) => frame.dataset = updated,
                TypeCheck::Mismatch { expected } => {
                    return Err(Error::observation_type_mismatch(
                        &frame.dataset,
                        &format.format,
                        &expected,
                    ));
                }
            }
        }

        let mut context = ObservationContext::new();
        context.observation_type = Some(format);
        context.phenomenon = Some(frame.dataset.phenomenon.clone());
        context.procedure = Some(frame.dataset.procedure.clone());
        context.offering = Some(frame.dataset.offering.clone());
        context.category = Some(frame.dataset.category.clone());
        context.platform = frame.dataset.platform.clone();
        context.unit = frame.dataset.unit.clone();
        context.feature = Some(frame.feature.clone());
        if frame.parent.is_some() && !frame.dataset.is_profile() {
            context.hidden_child = true;
        }
        if !context.is_set_platform() {
            context.platform = Some(self.session.get_or_insert_platform(&frame.feature)?);
        }

        self.apply_parameters(frame, &mut row, &mut context)?;
        if let Some(vertical) = context.vertical.take() {
            context.vertical = Some(self.session.get_or_insert_vertical_metadata(vertical)?);
        }
        if let Some(vertical) = frame.dataset.vertical_metadata.clone() {
            context.vertical = Some(vertical);
        }

        // Saved
        let dataset = self.session.apply_context(&context, &mut row)?;
        let id = self.session.save(row)?;
        self.session.flush()?;
        let row = self.session.refresh(id)?;

        // Refreshed
        self.session.update_series_bounds(dataset.id, &row)?;
        debug!(row = %id, dataset = %dataset.id, kind = %row.kind(), "observation row persisted");
        Ok(row)
    }

    fn add_identifier(&mut self, frame: &Frame, row: &mut DataRow) -> Result<()> {
        match &frame.observation.identifier {
            Some(coded) => {
                guard::validate_identifier(&coded.value)?;
                row.identifier = Some(coded.value.clone());
                if let Some(codespace) = &coded.codespace {
                    row.identifier_codespace =
                        Some(self.caches.codespace(codespace, self.session)?.id);
                }
            }
            None => {
                row.identifier = Some(self.id_gen.generate(&frame.observation));
            }
        }
        Ok(())
    }

    fn add_name(&mut self, frame: &Frame, row: &mut DataRow) -> Result<()> {
        if let Some(name) = &frame.observation.name {
            row.name = Some(name.value.clone());
            if let Some(codespace) = &name.codespace {
                row.name_codespace = Some(self.caches.codespace(codespace, self.session)?.id);
            }
        }
        Ok(())
    }

    fn apply_parameters(
        &mut self,
        frame: &mut Frame,
        row: &mut DataRow,
        context: &mut ObservationContext,
    ) -> Result<()> {
        let holder = &mut frame.observation.parameters;
        if holder.is_empty() {
            return Ok(());
        }
        if let Some(span) = guard::merge_vertical_parameters(holder, self.caches, self.session)? {
            row.vertical_from = Some(span.from);
            row.vertical_to = Some(span.to);
            context.vertical = Some(span.metadata);
        }
        if !holder.is_empty() {
            row.parameters = guard::parameter_rows(holder, self.caches, self.session)?;
        }
        Ok(())
    }

    fn collect_offering(&mut self, offering: &OfferingEntity) {
        if !self.offerings.iter().any(|o| o.id == offering.id) {
            self.offerings.push(offering.clone());
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn saved_id(row: &DataRow) -> Result<RowId> {
    row.id.ok_or_else(|| Error::storage("row has no id after refresh"))
}

/// Derive the observation a profile level's children are persisted from:
/// the parent observation plus the level's phenomenon time and vertical
/// boundary parameters (start/end, or end-only when start is absent).
fn observation_with_level_parameters(parent: &Observation, level: &ProfileLevel) -> Observation {
    let mut observation = parent.clone();
    if let Some(time) = &level.phenomenon_time {
        observation.phenomenon_time = *time;
    }
    match (&level.start, &level.end) {
        (Some(start), Some(end)) => {
            observation.parameters.push(level_parameter(start, names::FROM));
            observation.parameters.push(level_parameter(end, names::TO));
        }
        (None, Some(end)) => {
            observation.parameters.push(level_parameter(end, names::DEPTH));
        }
        (Some(start), None) => {
            observation.parameters.push(level_parameter(start, names::DEPTH));
        }
        (None, None) => {}
    }
    observation
}

fn level_parameter(quantity: &Quantity, fallback_name: &str) -> NamedParameter {
    let name = quantity.definition.clone().unwrap_or_else(|| fallback_name.to_owned());
    NamedParameter::quantity(name, quantity.clone())
}
