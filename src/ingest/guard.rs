//! Dataset-level consistency rules: observation-type compatibility,
//! vertical parameter merging, and the feature geometry update rule.

use smallvec::SmallVec;

use crate::entity::{DatasetEntity, FeatureEntity, ParameterRow, RowId, VerticalMetadataEntity};
use crate::model::{NamedParameter, ParameterHolder, ParameterValue};
use crate::storage::StorageSession;
use crate::{Error, Result};

use super::caches::RefCaches;

/// Orientation constants for vertical metadata.
const ORIENTATION_DEPTH: i16 = -1;
const ORIENTATION_HEIGHT: i16 = 1;

/// Whether the type compatibility check applies to this row.
///
/// Children below a profile or data-array series represent decomposed
/// sub-values and may carry a different storage kind; everything else is
/// checked.
pub fn requires_type_check(dataset: &DatasetEntity, parent: Option<RowId>) -> bool {
    if dataset.is_profile() || dataset.is_data_array() {
        parent.is_none()
    } else {
        true
    }
}

/// Whether a sampling geometry may overwrite the feature's geometry:
/// only for top-level rows, and only when the feature allows it.
pub fn should_update_feature_geometry(feature: &FeatureEntity, parent: Option<RowId>) -> bool {
    feature.geometry_updatable && parent.is_none()
}

/// A merged vertical extent plus its descriptor, derived from the
/// parameter bag.
#[derive(Debug, Clone)]
pub struct VerticalSpan {
    pub from: f64,
    pub to: f64,
    pub metadata: VerticalMetadataEntity,
}

/// Derive the vertical extent from the parameter bag, consuming the
/// parameters that produced it.
///
/// Height/depth and from/to are mutually exclusive per observation; when
/// both are present the height/depth pair wins and the from/to pair is
/// left in the bag.
pub fn merge_vertical_parameters<S: StorageSession>(
    holder: &mut ParameterHolder,
    caches: &mut RefCaches,
    session: &mut S,
) -> Result<Option<VerticalSpan>> {
    if let Some((name, quantity, depth)) = holder.height_depth().map(|p| {
        (
            p.name.clone(),
            p.as_quantity().cloned(),
            ParameterHolder::is_depth(p),
        )
    }) {
        let quantity =
            quantity.ok_or_else(|| Error::storage("height/depth parameter without quantity"))?;
        let mut metadata = VerticalMetadataEntity {
            from_name: Some(name.clone()),
            to_name: Some(name.clone()),
            orientation: Some(if depth { ORIENTATION_DEPTH } else { ORIENTATION_HEIGHT }),
            ..VerticalMetadataEntity::default()
        };
        if let Some(unit) = &quantity.unit {
            metadata.unit = Some(caches.unit(unit, session)?);
        }
        holder.remove(&name);
        return Ok(Some(VerticalSpan { from: quantity.value, to: quantity.value, metadata }));
    }

    if let Some((from_name, from_quantity, to_name, to_quantity)) = holder
        .from_to()
        .map(|(f, t)| (f.name.clone(), f.as_quantity().cloned(), t.name.clone(), t.as_quantity().cloned()))
    {
        let from_quantity =
            from_quantity.ok_or_else(|| Error::storage("from parameter without quantity"))?;
        let to_quantity =
            to_quantity.ok_or_else(|| Error::storage("to parameter without quantity"))?;
        let mut metadata = VerticalMetadataEntity {
            from_name: Some(from_name.clone()),
            to_name: Some(to_name.clone()),
            ..VerticalMetadataEntity::default()
        };
        if let Some(unit) = &from_quantity.unit {
            metadata.unit = Some(caches.unit(unit, session)?);
        }
        holder.remove(&from_name);
        holder.remove(&to_name);
        return Ok(Some(VerticalSpan {
            from: from_quantity.value,
            to: to_quantity.value,
            metadata,
        }));
    }

    Ok(None)
}

/// Translate every parameter still in the bag into generic parameter
/// rows, resolving units for quantity parameters. Empties the bag.
pub fn parameter_rows<S: StorageSession>(
    holder: &mut ParameterHolder,
    caches: &mut RefCaches,
    session: &mut S,
) -> Result<SmallVec<[ParameterRow; 2]>> {
    let mut rows = SmallVec::new();
    for parameter in holder.drain() {
        let NamedParameter { name, value } = parameter;
        let unit = match &value {
            ParameterValue::Quantity(q) => match &q.unit {
                Some(unit) => Some(caches.unit(unit, session)?.id),
                None => None,
            },
            _ => None,
        };
        rows.push(ParameterRow { name, value, unit });
    }
    Ok(rows)
}

/// Reject identifiers that cannot survive as storage keys.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() || identifier.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidParameterValue {
            parameter: "identifier".into(),
            message: format!("malformed observation identifier '{identifier}'"),
        });
    }
    Ok(())
}
