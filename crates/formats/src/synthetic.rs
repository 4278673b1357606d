//! Placeholder geometry for when a boundary source is unusable.
//!
//! Both generators are infallible: the worst case is an empty collection, which
//! downstream consumers handle like any other.

use std::collections::HashSet;

use foundation::ids::ID_ALIASES;
use serde_json::{Map, Value};

use crate::geojson::{Feature, FeatureCollection, Geometry, Position, Ring};
use crate::tabular::TractRecord;

/// Approximate half-width of a fallback neighborhood square, in degrees (~2 km).
pub const DEFAULT_PLACE_HALF_WIDTH: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct NamedPlace {
    pub name: String,
    pub center: Position,
}

impl NamedPlace {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            name: name.into(),
            center: Position::new(lon, lat),
        }
    }
}

/// The two neighborhoods the narrative focuses on.
pub fn default_places() -> Vec<NamedPlace> {
    vec![
        NamedPlace::new("Dorchester", -71.053, 42.300),
        NamedPlace::new("Back Bay", -71.080, 42.350),
    ]
}

/// Grid used to lay out one placeholder cell per tract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub origin: Position,
    /// Cell edge length in degrees.
    pub cell_size: f64,
    pub columns: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            origin: Position::new(-71.08, 42.35),
            cell_size: 0.005,
            columns: 10,
        }
    }
}

impl GridLayout {
    /// Lower-left corner of cell `index` (row-major).
    pub fn cell_origin(&self, index: usize) -> Position {
        let columns = self.columns.max(1);
        let row = (index / columns) as f64;
        let col = (index % columns) as f64;
        Position::new(
            self.origin.lon + col * self.cell_size,
            self.origin.lat + row * self.cell_size,
        )
    }
}

/// Closed counter-clockwise rectangle ring starting at `min`.
fn rectangle(min: Position, max: Position) -> Ring {
    vec![
        Position::new(min.lon, min.lat),
        Position::new(max.lon, min.lat),
        Position::new(max.lon, max.lat),
        Position::new(min.lon, max.lat),
        Position::new(min.lon, min.lat),
    ]
}

/// One square per place, centered on the place.
pub fn named_place_collection(places: &[NamedPlace], half_width: f64) -> FeatureCollection {
    let features = places
        .iter()
        .map(|place| {
            let c = place.center;
            let ring = rectangle(
                Position::new(c.lon - half_width, c.lat - half_width),
                Position::new(c.lon + half_width, c.lat + half_width),
            );
            let mut properties = Map::new();
            properties.insert(
                "blockgr2020_ctr_neighb_name".to_string(),
                Value::from(place.name.as_str()),
            );
            properties.insert("name".to_string(), Value::from(place.name.as_str()));
            Feature::new(properties, Geometry::Polygon(vec![ring]))
        })
        .collect();
    FeatureCollection::new(features)
}

/// One grid cell per distinct tract identifier, in first-seen order.
///
/// Each cell is tagged with every identifier alias a real boundary file might
/// use, so normalization treats it exactly like real data.
pub fn tract_grid_collection(records: &[TractRecord], layout: &GridLayout) -> FeatureCollection {
    let mut seen: HashSet<&str> = HashSet::new();
    let ids: Vec<&str> = records
        .iter()
        .filter_map(TractRecord::raw_id)
        .filter(|id| seen.insert(*id))
        .collect();

    let features = ids
        .into_iter()
        .enumerate()
        .map(|(index, id)| {
            let min = layout.cell_origin(index);
            let max = Position::new(min.lon + layout.cell_size, min.lat + layout.cell_size);
            let mut properties = Map::new();
            for alias in ID_ALIASES {
                properties.insert(alias.to_string(), Value::from(id));
            }
            Feature::new(properties, Geometry::Polygon(vec![rectangle(min, max)]))
        })
        .collect();
    FeatureCollection::new(features)
}
