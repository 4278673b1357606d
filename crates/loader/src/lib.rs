//! Startup data load.
//!
//! Fetches the four datasets concurrently, then parses, normalizes and
//! publishes them into an [`AtlasState`] one at a time. A broken geometry
//! source is replaced by synthetic placeholder geometry; a broken tabular or
//! census source leaves an empty dataset and marks the load as failed. The
//! state is structurally valid whatever happens.

pub mod config;
pub mod sources;

use std::fmt;
use std::sync::Arc;

use compute::scales::compute_scale_bounds;
use formats::geojson::{FeatureCollection, GeoJsonError};
use formats::normalize::{normalize_features, normalize_records};
use formats::synthetic::{named_place_collection, tract_grid_collection};
use formats::tabular::{
    has_identifier_column, read_census_rows, read_tract_records, TabularError,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use views::AtlasState;

pub use config::LoaderConfig;
pub use sources::{
    BoxFuture, DataSource, DataSourceError, DataSourceErrorKind, FilesystemSource, HttpSource,
    MemorySource,
};

/// What happened to one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Loaded { count: usize },
    Fallback { count: usize },
    Failed,
}

impl SourceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub tabular: SourceOutcome,
    pub neighborhoods: SourceOutcome,
    pub tracts: SourceOutcome,
    pub census: SourceOutcome,
    /// Records with no usable identifier.
    pub keyless_records: usize,
    /// Tract features with no usable identifier.
    pub keyless_tracts: usize,
}

impl LoadReport {
    /// False when tract statistics or census rows could not be loaded.
    /// Geometry fallbacks do not count as failures.
    pub fn succeeded(&self) -> bool {
        !self.tabular.is_failed() && !self.census.is_failed()
    }
}

#[derive(Debug)]
enum StageError {
    Fetch(DataSourceError),
    Tabular(TabularError),
    GeoJson(GeoJsonError),
    NoFeatures,
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Fetch(e) => write!(f, "fetch failed: {e}"),
            StageError::Tabular(e) => write!(f, "{e}"),
            StageError::GeoJson(e) => write!(f, "{e}"),
            StageError::NoFeatures => write!(f, "collection has no features"),
        }
    }
}

impl From<DataSourceError> for StageError {
    fn from(e: DataSourceError) -> Self {
        StageError::Fetch(e)
    }
}

impl From<TabularError> for StageError {
    fn from(e: TabularError) -> Self {
        StageError::Tabular(e)
    }
}

impl From<GeoJsonError> for StageError {
    fn from(e: GeoJsonError) -> Self {
        StageError::GeoJson(e)
    }
}

fn parse_geometry(
    resource: &str,
    fetched: Result<Vec<u8>, DataSourceError>,
) -> Result<FeatureCollection, StageError> {
    let collection = FeatureCollection::from_slice(&fetched?)?;
    if collection.is_empty() {
        return Err(StageError::NoFeatures);
    }
    let unmodeled = collection.unmodeled_geometries();
    if unmodeled > 0 {
        warn!(resource, unmodeled, "keeping features with unmodeled geometry as raw JSON");
    }
    Ok(collection)
}

pub struct Loader {
    source: Arc<dyn DataSource>,
    config: LoaderConfig,
}

impl Loader {
    pub fn new(source: Arc<dyn DataSource>, config: LoaderConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub async fn load_into(&self, state: &AtlasState) -> LoadReport {
        let cfg = &self.config;
        info!(source = %self.source.describe(), "loading datasets");

        let (tabular, neighborhoods, tracts, census) = tokio::join!(
            self.source.fetch(&cfg.tabular),
            self.source.fetch(&cfg.neighborhoods),
            self.source.fetch(&cfg.tracts),
            self.source.fetch(&cfg.census),
        );

        // Tract statistics. Bounds go out before the records they describe.
        let parsed = tabular
            .map_err(StageError::from)
            .and_then(|bytes| Ok(read_tract_records(&bytes)?));
        let (mut records, tabular_outcome) = match parsed {
            Ok(records) => {
                if records.first().is_some_and(|r| !has_identifier_column(&r.fields)) {
                    warn!(resource = %cfg.tabular, "tract statistics have no identifier column");
                }
                let count = records.len();
                (records, SourceOutcome::Loaded { count })
            }
            Err(e) => {
                warn!(resource = %cfg.tabular, error = %e, "tract statistics unavailable");
                (Vec::new(), SourceOutcome::Failed)
            }
        };
        let keyless_records = normalize_records(&mut records);
        if keyless_records > 0 {
            debug!(keyless_records, "records without a usable identifier");
        }
        state.publish_scales(compute_scale_bounds(&records));
        state.publish_records(records);

        let parsed = parse_geometry(&cfg.neighborhoods, neighborhoods);
        let (mut places, neighborhoods_outcome) = match parsed {
            Ok(fc) => {
                let count = fc.len();
                (fc, SourceOutcome::Loaded { count })
            }
            Err(e) => {
                warn!(resource = %cfg.neighborhoods, error = %e, "using placeholder neighborhoods");
                let fc = named_place_collection(&cfg.places, cfg.place_half_width);
                let count = fc.len();
                (fc, SourceOutcome::Fallback { count })
            }
        };
        normalize_features(&mut places);
        state.publish_neighborhoods(places);

        let parsed = parse_geometry(&cfg.tracts, tracts);
        let (mut boundaries, tracts_outcome) = match parsed {
            Ok(fc) => {
                let count = fc.len();
                (fc, SourceOutcome::Loaded { count })
            }
            Err(e) => {
                warn!(resource = %cfg.tracts, error = %e, "using placeholder tract grid");
                let fc = tract_grid_collection(&state.records().get(), &cfg.grid);
                let count = fc.len();
                (fc, SourceOutcome::Fallback { count })
            }
        };
        let keyless_tracts = normalize_features(&mut boundaries);
        state.publish_tract_boundaries(boundaries);

        let parsed = census
            .map_err(StageError::from)
            .and_then(|bytes| Ok(read_census_rows(&bytes)?));
        let (rows, census_outcome) = match parsed {
            Ok(rows) => {
                let count = rows.len();
                (rows, SourceOutcome::Loaded { count })
            }
            Err(e) => {
                warn!(resource = %cfg.census, error = %e, "census rows unavailable");
                (Vec::new(), SourceOutcome::Failed)
            }
        };
        state.publish_census(rows);

        let report = LoadReport {
            tabular: tabular_outcome,
            neighborhoods: neighborhoods_outcome,
            tracts: tracts_outcome,
            census: census_outcome,
            keyless_records,
            keyless_tracts,
        };
        info!(succeeded = report.succeeded(), ?report, "load finished");
        report
    }
}
