//! Coordinate axis-order normalization.
//!
//! Decoders hand over geometries in whatever axis order the source
//! encoding used; storage keeps exactly one convention. Every geometry
//! passes through [`GeometryNormalizer::normalize`] before it is stored
//! or compared.

use geo::MapCoords;
use geo_types::{Coord, Geometry};
use serde::{Deserialize, Serialize};

/// Coordinate axis order of a geometry source or sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOrder {
    /// x = longitude / easting, y = latitude / northing.
    LonLat,
    /// x = latitude / northing, y = longitude / easting.
    LatLon,
}

/// Axis orders of the decoder output and the datasource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub decoder_order: AxisOrder,
    pub datasource_order: AxisOrder,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { decoder_order: AxisOrder::LonLat, datasource_order: AxisOrder::LonLat }
    }
}

/// Swaps coordinate axes when decoder and datasource conventions differ.
#[derive(Debug, Clone, Copy)]
pub struct GeometryNormalizer {
    swap: bool,
}

impl GeometryNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { swap: config.decoder_order != config.datasource_order }
    }

    pub fn normalize(&self, geometry: Geometry<f64>) -> Geometry<f64> {
        if !self.swap {
            return geometry;
        }
        geometry.map_coords(|c| Coord { x: c.y, y: c.x })
    }
}

impl Default for GeometryNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;

    #[test]
    fn test_identity_when_orders_match() {
        let normalizer = GeometryNormalizer::default();
        let g: Geometry<f64> = point!(x: 7.52, y: 52.0).into();
        assert_eq!(normalizer.normalize(g.clone()), g);
    }

    #[test]
    fn test_swap_when_orders_differ() {
        let normalizer = GeometryNormalizer::new(NormalizerConfig {
            decoder_order: AxisOrder::LatLon,
            datasource_order: AxisOrder::LonLat,
        });
        let g: Geometry<f64> = point!(x: 52.0, y: 7.52).into();
        let expected: Geometry<f64> = point!(x: 7.52, y: 52.0).into();
        assert_eq!(normalizer.normalize(g), expected);
    }
}
