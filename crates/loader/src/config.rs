use std::env;
use std::str::FromStr;

use formats::geojson::Position;
use formats::synthetic::{default_places, GridLayout, NamedPlace, DEFAULT_PLACE_HALF_WIDTH};

pub const DEFAULT_TABULAR_RESOURCE: &str = "processed_eviction_data.csv";
pub const DEFAULT_NEIGHBORHOODS_RESOURCE: &str = "Boston_Neighborhoods.geojson";
pub const DEFAULT_TRACTS_RESOURCE: &str = "Metro_Boston_Census_Tracts.geojson";
pub const DEFAULT_CENSUS_RESOURCE: &str = "census.csv";

/// Resource names and fallback geometry for one load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub tabular: String,
    pub neighborhoods: String,
    pub tracts: String,
    pub census: String,
    pub places: Vec<NamedPlace>,
    pub place_half_width: f64,
    pub grid: GridLayout,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            tabular: DEFAULT_TABULAR_RESOURCE.to_string(),
            neighborhoods: DEFAULT_NEIGHBORHOODS_RESOURCE.to_string(),
            tracts: DEFAULT_TRACTS_RESOURCE.to_string(),
            census: DEFAULT_CENSUS_RESOURCE.to_string(),
            places: default_places(),
            place_half_width: DEFAULT_PLACE_HALF_WIDTH,
            grid: GridLayout::default(),
        }
    }
}

impl LoaderConfig {
    /// Defaults overridden by `TRACTSCOPE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`LoaderConfig::from_env`], reading variables through `lookup`.
    /// Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let grid = GridLayout {
            origin: Position::new(
                env_var(&lookup, "TRACTSCOPE_GRID_ORIGIN_LON", defaults.grid.origin.lon),
                env_var(&lookup, "TRACTSCOPE_GRID_ORIGIN_LAT", defaults.grid.origin.lat),
            ),
            cell_size: env_var(&lookup, "TRACTSCOPE_GRID_CELL_SIZE", defaults.grid.cell_size),
            columns: env_var(&lookup, "TRACTSCOPE_GRID_COLUMNS", defaults.grid.columns),
        };

        Self {
            tabular: env_var_string(&lookup, "TRACTSCOPE_TABULAR", defaults.tabular),
            neighborhoods: env_var_string(
                &lookup,
                "TRACTSCOPE_NEIGHBORHOODS",
                defaults.neighborhoods,
            ),
            tracts: env_var_string(&lookup, "TRACTSCOPE_TRACTS", defaults.tracts),
            census: env_var_string(&lookup, "TRACTSCOPE_CENSUS", defaults.census),
            places: defaults.places,
            place_half_width: env_var(
                &lookup,
                "TRACTSCOPE_PLACE_HALF_WIDTH",
                defaults.place_half_width,
            ),
            grid,
        }
    }
}

fn env_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_string(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: String,
) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}
