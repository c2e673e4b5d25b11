//! End-to-end tests for profile value decomposition.

use chrono::{TimeZone, Utc};
use geo_types::{Geometry, point};
use pretty_assertions::assert_eq;

use obs_series_rs::entity::format;
use obs_series_rs::model::{
    Observation, ProfileLevel, ProfileValue, Quantity, TimeSpan, UoM, Value,
};
use obs_series_rs::{
    DatasetEntity, FeatureEntity, Ingester, MemorySession, MemoryStore, Payload, StorageSession,
};

fn at() -> TimeSpan {
    TimeSpan::instant(Utc.with_ymd_and_hms(2024, 5, 14, 10, 30, 0).unwrap())
}

fn setup() -> (MemoryStore, MemorySession, DatasetEntity, FeatureEntity) {
    let store = MemoryStore::new();
    let feature = store.insert_feature("borehole-3", None, false);
    let procedure = store.insert_procedure("ctd-probe");
    let offering = store.insert_offering("offering-1");
    let category = store.insert_category("default");
    let mut session = store.begin();
    let phenomenon = session.get_or_insert_phenomenon("water-temperature").unwrap();
    let dataset = session
        .check_or_insert_series(&procedure, &phenomenon, &offering, &category, &feature, None, false)
        .unwrap();
    (store, session, dataset, feature)
}

fn level(start: f64, end: f64, value: f64) -> ProfileLevel {
    ProfileLevel {
        start: Some(Quantity::new(start).with_unit(UoM::new("m")).with_definition("from")),
        end: Some(Quantity::new(end).with_unit(UoM::new("m")).with_definition("to")),
        location: None,
        phenomenon_time: None,
        values: vec![Value::Quantity(Quantity::new(value).with_unit(UoM::new("degC")))],
    }
}

fn three_level_profile() -> ProfileValue {
    ProfileValue {
        from_level: Some(Quantity::new(0.0).with_unit(UoM::new("m")).with_definition("from")),
        to_level: Some(Quantity::new(30.0).with_unit(UoM::new("m")).with_definition("to")),
        geometry: None,
        phenomenon_time: None,
        levels: vec![level(0.0, 10.0, 14.2), level(10.0, 20.0, 11.7), level(20.0, 30.0, 9.3)],
    }
}

// ============================================================================
// 1. n levels produce n children with matching vertical extents, in order
// ============================================================================

#[test]
fn test_profile_levels_in_input_order() {
    let (store, mut session, dataset, feature) = setup();
    let observation = Observation::new(at(), Value::Profile(three_level_profile()));

    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();
    let parent_id = outcome.row.id.unwrap();

    let children = store.children_of(parent_id);
    assert_eq!(children.len(), 3);

    let extents: Vec<(Option<f64>, Option<f64>)> =
        children.iter().map(|c| (c.vertical_from, c.vertical_to)).collect();
    assert_eq!(
        extents,
        vec![
            (Some(0.0), Some(10.0)),
            (Some(10.0), Some(20.0)),
            (Some(20.0), Some(30.0)),
        ]
    );
    assert_eq!(children[0].payload, Payload::Quantity(14.2));
    assert_eq!(children[1].payload, Payload::Quantity(11.7));
    assert_eq!(children[2].payload, Payload::Quantity(9.3));
}

// ============================================================================
// 2. Profile bounds pin the dataset's vertical metadata and parent extent
// ============================================================================

#[test]
fn test_profile_bounds_on_parent_and_dataset() {
    let (store, mut session, dataset, feature) = setup();
    let dataset_id = dataset.id;
    let observation = Observation::new(at(), Value::Profile(three_level_profile()));

    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let parent = store.row(outcome.row.id.unwrap()).unwrap();
    assert_eq!(parent.payload, Payload::Profile);
    assert_eq!(parent.vertical_from, Some(0.0));
    assert_eq!(parent.vertical_to, Some(30.0));

    let dataset = store.dataset(dataset_id).unwrap();
    assert_eq!(dataset.observation_type.unwrap().format, format::OBS_TYPE_PROFILE_OBSERVATION);
    let vertical = dataset.vertical_metadata.unwrap();
    assert_eq!(vertical.from_name.as_deref(), Some("from"));
    assert_eq!(vertical.to_name.as_deref(), Some("to"));
    assert_eq!(vertical.unit.unwrap().symbol, "m");
}

// ============================================================================
// 3. Profile children are not hidden and share the profile series
// ============================================================================

#[test]
fn test_profile_children_visible_in_same_series() {
    let (store, mut session, dataset, feature) = setup();
    let dataset_id = dataset.id;
    let observation = Observation::new(at(), Value::Profile(three_level_profile()));

    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    for child in store.children_of(outcome.row.id.unwrap()) {
        assert!(!child.hidden_child);
        assert_eq!(child.dataset, Some(dataset_id));
    }
    assert_eq!(store.dataset_count(), 1);
}

// ============================================================================
// 4. Level location becomes the child's sampling geometry
// ============================================================================

#[test]
fn test_level_location_becomes_child_sampling_geometry() {
    let (store, mut session, dataset, feature) = setup();
    let location: Geometry<f64> = point!(x: 7.52, y: 52.0).into();
    let mut profile = three_level_profile();
    profile.levels[1].location = Some(location.clone());

    let observation = Observation::new(at(), Value::Profile(profile));
    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let children = store.children_of(outcome.row.id.unwrap());
    assert_eq!(children[0].sampling_geometry, None);
    assert_eq!(children[1].sampling_geometry, Some(location));
    assert_eq!(children[2].sampling_geometry, None);
}

// ============================================================================
// 5. Profile-own phenomenon time overrides the observation's
// ============================================================================

#[test]
fn test_profile_phenomenon_time_override() {
    let (store, mut session, dataset, feature) = setup();
    let profile_time = TimeSpan::instant(Utc.with_ymd_and_hms(2024, 5, 14, 11, 0, 0).unwrap());
    let mut profile = three_level_profile();
    profile.phenomenon_time = Some(profile_time);

    let observation = Observation::new(at(), Value::Profile(profile));
    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let parent = store.row(outcome.row.id.unwrap()).unwrap();
    assert_eq!(parent.sampling_time, Some(profile_time));
}

// ============================================================================
// 6. End-only levels collapse the extent to a single depth
// ============================================================================

#[test]
fn test_end_only_level() {
    let (store, mut session, dataset, feature) = setup();
    let profile = ProfileValue {
        levels: vec![ProfileLevel {
            start: None,
            end: Some(Quantity::new(15.0).with_unit(UoM::new("m")).with_definition("depth")),
            location: None,
            phenomenon_time: None,
            values: vec![Value::Quantity(Quantity::new(10.4))],
        }],
        ..ProfileValue::default()
    };

    let observation = Observation::new(at(), Value::Profile(profile));
    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    let children = store.children_of(outcome.row.id.unwrap());
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].vertical_from, Some(15.0));
    assert_eq!(children[0].vertical_to, Some(15.0));
}

// ============================================================================
// 7. Levels without values are skipped
// ============================================================================

#[test]
fn test_empty_levels_skipped() {
    let (store, mut session, dataset, feature) = setup();
    let mut profile = three_level_profile();
    profile.levels[1].values.clear();

    let observation = Observation::new(at(), Value::Profile(profile));
    let outcome = Ingester::default().ingest(&mut session, dataset, feature, observation).unwrap();

    assert_eq!(store.children_of(outcome.row.id.unwrap()).len(), 2);
}
