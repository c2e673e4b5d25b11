//! # Decoded Observation Model
//!
//! Clean DTOs for the decoded observation value tree. These types cross
//! every boundary: decoder ↔ ingestion ↔ storage ↔ user.
//!
//! Design rule: pure data — no I/O, no state, no storage types here.

pub mod observation;
pub mod parameter;
pub mod value;

pub use observation::{CodedName, Observation, TimeSpan};
pub use parameter::{names, NamedParameter, ParameterHolder, ParameterValue};
pub use value::{
    CategoryValue, ProfileLevel, ProfileValue, Quantity, ReferenceValue, SweField, UoM, Value,
    ValueKind,
};
