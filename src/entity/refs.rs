//! Shared reference entities — the deduplicated lookup rows an
//! observation row points at.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::model::UoM;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(UnitId);
entity_id!(CodespaceId);
entity_id!(PhenomenonId);
entity_id!(OfferingId);
entity_id!(ProcedureId);
entity_id!(CategoryId);
entity_id!(PlatformId);
entity_id!(VerticalMetadataId);
entity_id!(FeatureId);

/// A stored unit of measure. Natural key: `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntity {
    pub id: UnitId,
    pub symbol: String,
    pub name: Option<String>,
    pub link: Option<String>,
}

impl UnitEntity {
    pub fn matches(&self, unit: &UoM) -> bool {
        self.symbol == unit.symbol
    }
}

/// A naming authority for identifiers and names. Natural key: `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodespaceEntity {
    pub id: CodespaceId,
    pub name: String,
}

/// The observed phenomenon. Natural key: `identifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenomenonEntity {
    pub id: PhenomenonId,
    pub identifier: String,
    pub name: Option<String>,
}

/// The offering an observation was inserted through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferingEntity {
    pub id: OfferingId,
    pub identifier: String,
    pub name: Option<String>,
}

/// The measuring procedure (sensor, simulation, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureEntity {
    pub id: ProcedureId,
    pub identifier: String,
    pub name: Option<String>,
}

/// A grouping category for series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntity {
    pub id: CategoryId,
    pub identifier: String,
    pub name: Option<String>,
}

/// The platform carrying the procedure. Derived from the feature when a
/// series does not declare one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntity {
    pub id: PlatformId,
    pub identifier: String,
    pub name: Option<String>,
}

/// Descriptor of a vertical axis: bound names, unit, and orientation
/// (+1 height, −1 depth).
///
/// Built transiently during parameter merging; `id` is `None` until the
/// descriptor has been materialized through the storage session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VerticalMetadataEntity {
    pub id: Option<VerticalMetadataId>,
    pub from_name: Option<String>,
    pub to_name: Option<String>,
    pub unit: Option<UnitEntity>,
    pub orientation: Option<i16>,
}

impl VerticalMetadataEntity {
    /// Natural key used for deduplication in storage.
    pub fn natural_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.from_name.as_deref().unwrap_or(""),
            self.to_name.as_deref().unwrap_or(""),
            self.unit.as_ref().map(|u| u.symbol.as_str()).unwrap_or(""),
            self.orientation.unwrap_or(0),
        )
    }
}

/// The sampling feature an observation is made about. Read-only during
/// ingestion except for the optional geometry update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntity {
    pub id: FeatureId,
    pub identifier: String,
    pub name: Option<String>,
    pub geometry: Option<Geometry<f64>>,
    /// Whether ingestion may overwrite `geometry` from a sampling geometry.
    pub geometry_updatable: bool,
}
