//! Per-tree reference entity caches.
//!
//! Scope is exactly one top-level ingestion call, including every
//! recursively spawned child. Within that scope each distinct codespace
//! name and unit symbol costs at most one storage round trip. The caches
//! are not an authoritative store — cross-tree deduplication is the
//! storage layer's uniqueness constraint.

use hashbrown::HashMap;
use tracing::trace;

use crate::Result;
use crate::entity::{CodespaceEntity, UnitEntity};
use crate::model::UoM;
use crate::storage::StorageSession;

#[derive(Debug, Default)]
pub struct RefCaches {
    codespaces: HashMap<String, CodespaceEntity>,
    units: HashMap<String, UnitEntity>,
}

impl RefCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a unit, hitting storage at most once per symbol.
    pub fn unit<S: StorageSession>(&mut self, unit: &UoM, session: &mut S) -> Result<UnitEntity> {
        if let Some(hit) = self.units.get(&unit.symbol) {
            trace!(unit = %unit.symbol, "unit cache hit");
            return Ok(hit.clone());
        }
        let resolved = session.get_or_insert_unit(unit)?;
        self.units.insert(unit.symbol.clone(), resolved.clone());
        Ok(resolved)
    }

    /// Resolve a codespace, hitting storage at most once per name.
    pub fn codespace<S: StorageSession>(
        &mut self,
        name: &str,
        session: &mut S,
    ) -> Result<CodespaceEntity> {
        if let Some(hit) = self.codespaces.get(name) {
            trace!(codespace = name, "codespace cache hit");
            return Ok(hit.clone());
        }
        let resolved = session.get_or_insert_codespace(name)?;
        self.codespaces.insert(name.to_owned(), resolved.clone());
        Ok(resolved)
    }
}
