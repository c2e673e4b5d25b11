//! End-to-end tests for scalar value kinds.
//!
//! Each test exercises the full pipeline: decoded observation -> dispatch
//! -> row state machine -> MemoryStore, through the public Ingester API.

use chrono::{TimeZone, Utc};
use geo_types::{Geometry, point};
use pretty_assertions::assert_eq;

use obs_series_rs::entity::format;
use obs_series_rs::model::{
    CategoryValue, CodedName, NamedParameter, Observation, ParameterValue, Quantity,
    ReferenceValue, TimeSpan, UoM, Value, names,
};
use obs_series_rs::{
    AxisOrder, DatasetEntity, FeatureEntity, Ingester, IngesterConfig, MemorySession, MemoryStore,
    NormalizerConfig, Payload, StorageSession,
};

fn at() -> TimeSpan {
    TimeSpan::instant(Utc.with_ymd_and_hms(2024, 5, 14, 10, 30, 0).unwrap())
}

fn setup(updatable_feature: bool) -> (MemoryStore, MemorySession, DatasetEntity, FeatureEntity) {
    let store = MemoryStore::new();
    let feature = store.insert_feature("station-1", None, updatable_feature);
    let procedure = store.insert_procedure("sensor-1");
    let offering = store.insert_offering("offering-1");
    let category = store.insert_category("default");
    let mut session = store.begin();
    let phenomenon = session.get_or_insert_phenomenon("air-temperature").unwrap();
    let dataset = session
        .check_or_insert_series(&procedure, &phenomenon, &offering, &category, &feature, None, false)
        .unwrap();
    (store, session, dataset, feature)
}

// ============================================================================
// 1. Quantity round-trip with unit capture
// ============================================================================

#[test]
fn test_quantity_roundtrip_and_unit_capture() {
    let (store, mut session, dataset, feature) = setup(false);
    let observation =
        Observation::new(at(), Quantity::new(21.5).with_unit(UoM::new("degC")));

    let ingester = Ingester::default();
    let outcome = ingester.ingest(&mut session, dataset, feature, observation).unwrap();

    let row = store.row(outcome.row.id.unwrap()).unwrap();
    assert_eq!(row.payload, Payload::Quantity(21.5));
    assert_eq!(row.parent, None);

    let dataset = store.dataset(row.dataset.unwrap()).unwrap();
    assert_eq!(dataset.unit.unwrap().symbol, "degC");
    assert_eq!(dataset.observation_type.unwrap().format, format::OBS_TYPE_MEASUREMENT);
}

// ============================================================================
// 2. Every remaining scalar kind round-trips
// ============================================================================

#[test]
fn test_scalar_kinds_roundtrip() {
    let cases: Vec<(Value, Payload)> = vec![
        (Value::Boolean(true), Payload::Truth(true)),
        (Value::Category(CategoryValue::new("rain")), Payload::Category("rain".into())),
        (Value::Count(17), Payload::Count(17)),
        (Value::Text("calm".into()), Payload::Text("calm".into())),
        (Value::Blob(vec![0xDE, 0xAD]), Payload::Blob(vec![0xDE, 0xAD])),
        (
            Value::Reference(ReferenceValue::new("https://data.example.org/obs/1").with_title("ref")),
            Payload::Reference {
                href: "https://data.example.org/obs/1".into(),
                title: Some("ref".into()),
            },
        ),
        (
            Value::Geometry(point!(x: 7.52, y: 52.0).into()),
            Payload::Geometry(point!(x: 7.52, y: 52.0).into()),
        ),
    ];

    for (value, expected) in cases {
        let (store, mut session, dataset, feature) = setup(false);
        let observation = Observation::new(at(), value);
        let outcome =
            Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();
        let row = store.row(outcome.row.id.unwrap()).unwrap();
        assert_eq!(row.payload, expected);
    }
}

// ============================================================================
// 3. Explicit identifier and codespace survive
// ============================================================================

#[test]
fn test_explicit_identifier_with_codespace() {
    let (store, mut session, dataset, feature) = setup(false);
    let observation = Observation::new(at(), 42i64)
        .with_identifier(
            CodedName::new("obs-2024-0042").with_codespace("http://sensors.example.org"),
        )
        .with_name(CodedName::new("station reading").with_codespace("http://sensors.example.org"))
        .with_description("morning reading");

    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let row = store.row(outcome.row.id.unwrap()).unwrap();
    assert_eq!(row.identifier.as_deref(), Some("obs-2024-0042"));
    assert_eq!(row.name.as_deref(), Some("station reading"));
    assert_eq!(row.description.as_deref(), Some("morning reading"));
    // Identifier and name share one codespace entity
    assert_eq!(row.identifier_codespace, row.name_codespace);
    assert_eq!(session.counters().codespace_calls, 1);
}

// ============================================================================
// 4. Missing identifier is generated, deterministically
// ============================================================================

#[test]
fn test_generated_identifier_is_deterministic() {
    let (store_a, mut session_a, dataset_a, feature_a) = setup(false);
    let (store_b, mut session_b, dataset_b, feature_b) = setup(false);
    let ingester = Ingester::default();

    let first = ingester
        .ingest(&mut session_a, dataset_a, feature_a, Observation::new(at(), 21.5))
        .unwrap();
    let second = ingester
        .ingest(&mut session_b, dataset_b, feature_b, Observation::new(at(), 21.5))
        .unwrap();

    let id_a = store_a.row(first.row.id.unwrap()).unwrap().identifier.unwrap();
    let id_b = store_b.row(second.row.id.unwrap()).unwrap().identifier.unwrap();
    assert!(id_a.starts_with("obs_"));
    assert_eq!(id_a, id_b);
}

// ============================================================================
// 5. Sampling geometry: attached to the row, cleared from parameters
// ============================================================================

#[test]
fn test_sampling_geometry_attached_and_parameter_cleared() {
    let (store, mut session, dataset, feature) = setup(false);
    let geometry: Geometry<f64> = point!(x: 7.52, y: 52.0).into();
    let observation = Observation::new(at(), 21.5).with_parameter(NamedParameter::new(
        names::SAMPLING_GEOMETRY,
        ParameterValue::Geometry(geometry.clone()),
    ));

    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let row = store.row(outcome.row.id.unwrap()).unwrap();
    assert_eq!(row.sampling_geometry, Some(geometry));
    // The spatial filtering parameter must not survive as a generic row
    assert!(row.parameters.is_empty());
}

// ============================================================================
// 6. Feature geometry update: top-level row, updatable feature
// ============================================================================

#[test]
fn test_feature_geometry_updated_for_top_level_row() {
    let (store, mut session, dataset, feature) = setup(true);
    let feature_id = feature.id;
    let geometry: Geometry<f64> = point!(x: 7.52, y: 52.0).into();
    let observation = Observation::new(at(), 21.5).with_parameter(NamedParameter::new(
        names::SAMPLING_GEOMETRY,
        ParameterValue::Geometry(geometry.clone()),
    ));

    Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    assert_eq!(store.feature(feature_id).unwrap().geometry, Some(geometry));
}

#[test]
fn test_feature_geometry_untouched_when_not_updatable() {
    let (store, mut session, dataset, feature) = setup(false);
    let feature_id = feature.id;
    let observation = Observation::new(at(), 21.5).with_parameter(NamedParameter::new(
        names::SAMPLING_GEOMETRY,
        ParameterValue::Geometry(point!(x: 7.52, y: 52.0).into()),
    ));

    Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    assert_eq!(store.feature(feature_id).unwrap().geometry, None);
}

// ============================================================================
// 7. Axis-order normalization applies to stored geometries
// ============================================================================

#[test]
fn test_axis_order_normalization() {
    let (store, mut session, dataset, feature) = setup(false);
    let ingester = Ingester::new(IngesterConfig {
        normalizer: NormalizerConfig {
            decoder_order: AxisOrder::LatLon,
            datasource_order: AxisOrder::LonLat,
        },
        ..IngesterConfig::default()
    });

    let observation = Observation::new(at(), Value::Geometry(point!(x: 52.0, y: 7.52).into()));
    let outcome = ingester.ingest(&mut session, dataset, feature, observation).unwrap();

    let row = store.row(outcome.row.id.unwrap()).unwrap();
    let expected: Geometry<f64> = point!(x: 7.52, y: 52.0).into();
    assert_eq!(row.payload, Payload::Geometry(expected));
}

// ============================================================================
// 8. Depth parameter becomes the vertical extent
// ============================================================================

#[test]
fn test_depth_parameter_merged_into_vertical_extent() {
    let (store, mut session, dataset, feature) = setup(false);
    let observation = Observation::new(at(), 4.8).with_parameter(NamedParameter::quantity(
        names::DEPTH,
        Quantity::new(12.0).with_unit(UoM::new("m")),
    ));

    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let row = store.row(outcome.row.id.unwrap()).unwrap();
    assert_eq!(row.vertical_from, Some(12.0));
    assert_eq!(row.vertical_to, Some(12.0));
    // The consumed parameter does not reappear as a generic row
    assert!(row.parameters.is_empty());

    let dataset = store.dataset(row.dataset.unwrap()).unwrap();
    let vertical = dataset.vertical_metadata.unwrap();
    assert_eq!(vertical.orientation, Some(-1));
    assert_eq!(vertical.unit.unwrap().symbol, "m");
}

// ============================================================================
// 9. Unrecognized parameters persist as generic parameter rows
// ============================================================================

#[test]
fn test_generic_parameters_persisted() {
    let (store, mut session, dataset, feature) = setup(false);
    let observation = Observation::new(at(), 21.5)
        .with_parameter(NamedParameter::new(
            "quality",
            ParameterValue::Category("checked".into()),
        ))
        .with_parameter(NamedParameter::quantity(
            "offset",
            Quantity::new(0.5).with_unit(UoM::new("s")),
        ));

    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let row = store.row(outcome.row.id.unwrap()).unwrap();
    assert_eq!(row.parameters.len(), 2);
    assert_eq!(row.parameters[0].name, "quality");
    assert_eq!(row.parameters[1].name, "offset");
    assert!(row.parameters[1].unit.is_some());
}

// ============================================================================
// 10. Series first/latest bookkeeping
// ============================================================================

#[test]
fn test_series_first_latest_updated() {
    let (store, mut session, dataset, feature) = setup(false);
    let ingester = Ingester::default();
    let early = TimeSpan::instant(Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0).unwrap());
    let late = TimeSpan::instant(Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap());

    let first = ingester
        .ingest(&mut session, dataset.clone(), feature.clone(), Observation::new(early, 20.0))
        .unwrap();
    let second = ingester
        .ingest(&mut session, dataset.clone(), feature, Observation::new(late, 22.0))
        .unwrap();

    let dataset = store.dataset(dataset.id).unwrap();
    let first_summary = dataset.first.unwrap();
    let latest_summary = dataset.latest.unwrap();
    assert_eq!(first_summary.row, first.row.id.unwrap());
    assert_eq!(first_summary.quantity, Some(20.0));
    assert_eq!(latest_summary.row, second.row.id.unwrap());
    assert_eq!(latest_summary.quantity, Some(22.0));
}

// ============================================================================
// 11. Offerings touched by the tree are reported once
// ============================================================================

#[test]
fn test_offerings_reported_once() {
    let (_store, mut session, dataset, feature) = setup(false);
    let offering_id = dataset.offering.id;

    let outcome = Ingester::default()
        .ingest(&mut session, dataset, feature, Observation::new(at(), 21.5))
        .unwrap();

    assert_eq!(outcome.offerings.len(), 1);
    assert_eq!(outcome.offerings[0].id, offering_id);
}

// ============================================================================
// 12. Property: generated identifiers are a pure function of content
// ============================================================================

mod properties {
    use super::*;
    use obs_series_rs::IdGenerator;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_identifier_deterministic(value in -1.0e6f64..1.0e6) {
            let generator = IdGenerator::default();
            let a = generator.generate(&Observation::new(at(), value));
            let b = generator.generate(&Observation::new(at(), value));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_identifier_discriminates(value in -1.0e6f64..1.0e6) {
            let generator = IdGenerator::default();
            let a = generator.generate(&Observation::new(at(), value));
            let b = generator.generate(&Observation::new(at(), value + 1.0));
            prop_assert_ne!(a, b);
        }
    }
}
