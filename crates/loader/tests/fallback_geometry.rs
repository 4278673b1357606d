use std::sync::Arc;

use foundation::ids::NORMALIZED_ID_FIELD;
use loader::{Loader, LoaderConfig, MemorySource, SourceOutcome};
use serde_json::Value;
use views::AtlasState;

const TABULAR: &str = "\
GEOID,sum_institutional_investor,sum_small_investor,eviction_rate_2021,eviction_rate_2023
1400000US25025010100,2,7,0.04,0.06
25025010200,1,3,0.08,1.5
25025010300,0,9,NA,0.02
25025010100,5,1,0.01,0.03
";

fn source_with_failing_geometry() -> MemorySource {
    let config = LoaderConfig::default();
    MemorySource::new()
        .with_resource(config.tabular.clone(), TABULAR)
        .with_status(config.neighborhoods.clone(), 502)
        .with_status(config.tracts.clone(), 500)
        .with_resource(config.census.clone(), "GEOID,households\n25025010200,880\n")
}

#[tokio::test]
async fn failed_geometry_fetches_yield_normalized_placeholders() {
    let state = AtlasState::new();
    let loader = Loader::new(Arc::new(source_with_failing_geometry()), LoaderConfig::default());
    let report = loader.load_into(&state).await;

    assert!(report.succeeded());
    assert_eq!(report.neighborhoods, SourceOutcome::Fallback { count: 2 });
    assert_eq!(report.tracts, SourceOutcome::Fallback { count: 4 });

    let boundaries = state.tract_boundaries().get();
    assert!(!boundaries.is_empty());
    for feature in &boundaries.features {
        assert!(matches!(
            feature.properties.get(NORMALIZED_ID_FIELD),
            Some(Value::String(id)) if id.chars().all(|c| c.is_ascii_digit())
        ));
    }

    let geojson = boundaries.to_value();
    assert_eq!(geojson["type"], "FeatureCollection");
    assert_eq!(geojson["features"][0]["geometry"]["type"], "Polygon");
}

#[tokio::test]
async fn placeholder_grid_joins_every_keyed_record() {
    let state = AtlasState::new();
    let loader = Loader::new(Arc::new(source_with_failing_geometry()), LoaderConfig::default());
    loader.load_into(&state).await;

    let index = state.tract_index().get();
    // "1400000US25025010100" and "25025010100" normalize differently.
    assert_eq!(index.len(), 4);
    assert_eq!(index.matched().count(), 4);
    assert_eq!(index.records_without_boundary(), 0);
}

#[tokio::test]
async fn placeholder_geometry_uses_configured_grid() {
    let mut config = LoaderConfig::default();
    config.grid.columns = 1;
    config.grid.cell_size = 0.01;

    let state = AtlasState::new();
    let loader = Loader::new(Arc::new(source_with_failing_geometry()), config);
    loader.load_into(&state).await;

    let geojson = state.tract_boundaries().get().to_value();
    let second_cell = &geojson["features"][1]["geometry"]["coordinates"][0][0];
    let lon = second_cell[0].as_f64().unwrap();
    let lat = second_cell[1].as_f64().unwrap();
    assert!((lon - -71.08).abs() < 1e-9);
    assert!((lat - 42.36).abs() < 1e-9);
}
