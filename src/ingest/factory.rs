//! Draft row construction, one method per storage kind.
//!
//! Injected into the persister at construction; hosts with custom row
//! subtypes swap in their own factory value instead of reaching for a
//! global.

use geo_types::Geometry;

use crate::entity::{DataRow, Payload};

#[derive(Debug, Clone, Copy, Default)]
pub struct RowFactory;

impl RowFactory {
    pub fn truth(&self, value: bool) -> DataRow {
        DataRow::new(Payload::Truth(value))
    }

    pub fn category(&self, value: impl Into<String>) -> DataRow {
        DataRow::new(Payload::Category(value.into()))
    }

    pub fn count(&self, value: i64) -> DataRow {
        DataRow::new(Payload::Count(value))
    }

    pub fn numeric(&self, value: f64) -> DataRow {
        DataRow::new(Payload::Quantity(value))
    }

    pub fn text(&self, value: impl Into<String>) -> DataRow {
        DataRow::new(Payload::Text(value.into()))
    }

    pub fn geometry(&self, geometry: Geometry<f64>) -> DataRow {
        DataRow::new(Payload::Geometry(geometry))
    }

    pub fn blob(&self, bytes: Vec<u8>) -> DataRow {
        DataRow::new(Payload::Blob(bytes))
    }

    pub fn reference(&self, href: impl Into<String>, title: Option<String>) -> DataRow {
        DataRow::new(Payload::Reference { href: href.into(), title })
    }

    pub fn complex(&self) -> DataRow {
        DataRow::new(Payload::Complex)
    }

    pub fn profile(&self) -> DataRow {
        DataRow::new(Payload::Profile)
    }
}
