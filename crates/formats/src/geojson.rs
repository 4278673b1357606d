//! GeoJSON feature collections for tract and neighborhood boundaries.
//!
//! Parsing is strict about structure (a collection must expose a `features`
//! array and every feature must be an object) and lenient about content:
//! properties are kept as an untyped JSON map so alias fields from any
//! upstream schema survive untouched, and geometry types outside the model are
//! carried as raw JSON.

use std::fmt;

use foundation::ids::{NORMALIZED_ID_FIELD, TractId};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
    /// Any other geometry object (e.g. `GeometryCollection`), kept verbatim.
    Other(Value),
}

impl Geometry {
    pub fn type_name(&self) -> &str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::Other(raw) => raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown"),
        }
    }

    pub fn is_modeled(&self) -> bool {
        !matches!(self, Geometry::Other(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// `None` for features whose geometry is JSON `null` or absent.
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(properties: Map<String, Value>, geometry: Geometry) -> Self {
        Self {
            id: None,
            properties,
            geometry: Some(geometry),
        }
    }

    /// Canonical key previously attached by normalization, if any.
    pub fn normalized_id(&self) -> Option<TractId> {
        self.properties
            .get(NORMALIZED_ID_FIELD)
            .and_then(Value::as_str)
            .and_then(TractId::normalize)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug)]
pub enum GeoJsonError {
    Parse(serde_json::Error),
    NotAFeatureCollection,
    MissingFeatures,
    InvalidFeature { index: usize, reason: String },
}

impl fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoJsonError::Parse(e) => write!(f, "GeoJSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection => write!(f, "expected a FeatureCollection"),
            GeoJsonError::MissingFeatures => write!(f, "collection has no features array"),
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features whose geometry is carried as raw JSON.
    pub fn unmodeled_geometries(&self) -> usize {
        self.features
            .iter()
            .filter(|f| f.geometry.as_ref().is_some_and(|g| !g.is_modeled()))
            .count()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_slice(bytes).map_err(GeoJsonError::Parse)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        match obj.get("type").and_then(Value::as_str) {
            None | Some("FeatureCollection") => {}
            Some(_) => return Err(GeoJsonError::NotAFeatureCollection),
        }

        let raw_features = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::MissingFeatures)?;

        let features = raw_features
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                parse_feature(raw).map_err(|reason| GeoJsonError::InvalidFeature { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { features })
    }

    /// Emits a GeoJSON FeatureCollection. Property order follows the map.
    pub fn to_value(&self) -> Value {
        let features: Vec<Value> = self.features.iter().map(feature_to_value).collect();
        json!({ "type": "FeatureCollection", "features": features })
    }
}

impl Serialize for FeatureCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn feature_to_value(feature: &Feature) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::from("Feature"));
    if let Some(id) = &feature.id {
        obj.insert("id".to_string(), Value::from(id.as_str()));
    }
    obj.insert(
        "properties".to_string(),
        Value::Object(feature.properties.clone()),
    );
    let geometry = feature
        .geometry
        .as_ref()
        .map(geometry_to_value)
        .unwrap_or(Value::Null);
    obj.insert("geometry".to_string(), geometry);
    Value::Object(obj)
}

fn geometry_to_value(geometry: &Geometry) -> Value {
    let coordinates = match geometry {
        Geometry::Other(raw) => return raw.clone(),
        Geometry::Point(p) => position_value(p),
        Geometry::MultiPoint(ps) | Geometry::LineString(ps) => positions_value(ps),
        Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
            Value::Array(lines.iter().map(|l| positions_value(l)).collect())
        }
        Geometry::MultiPolygon(polys) => Value::Array(
            polys
                .iter()
                .map(|rings| Value::Array(rings.iter().map(|r| positions_value(r)).collect()))
                .collect(),
        ),
    };
    json!({ "type": geometry.type_name(), "coordinates": coordinates })
}

fn position_value(p: &Position) -> Value {
    json!([p.lon, p.lat])
}

fn positions_value(ps: &[Position]) -> Value {
    Value::Array(ps.iter().map(position_value).collect())
}

fn parse_feature(raw: &Value) -> Result<Feature, String> {
    let obj = raw.as_object().ok_or("feature must be an object")?;
    match obj.get("type").and_then(Value::as_str) {
        None | Some("Feature") => {}
        Some(other) => return Err(format!("unexpected feature type: {other}")),
    }

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = match obj.get("properties") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(_) => return Err("properties must be an object".to_string()),
    };

    let geometry = match obj.get("geometry") {
        Some(Value::Null) | None => None,
        Some(value) => Some(parse_geometry(value)?),
    };

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value.as_object().ok_or("geometry must be an object")?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type")?;
    let coords = || {
        obj.get("coordinates")
            .ok_or_else(|| format!("{ty} missing coordinates"))
    };

    let geometry = match ty {
        "Point" => Geometry::Point(parse_position(coords()?)?),
        "MultiPoint" => Geometry::MultiPoint(parse_positions(coords()?)?),
        "LineString" => Geometry::LineString(parse_positions(coords()?)?),
        "MultiLineString" => Geometry::MultiLineString(parse_nested(coords()?, parse_positions)?),
        "Polygon" => Geometry::Polygon(parse_nested(coords()?, parse_positions)?),
        "MultiPolygon" => Geometry::MultiPolygon(parse_nested(coords()?, |rings| {
            parse_nested(rings, parse_positions)
        })?),
        _ => Geometry::Other(value.clone()),
    };
    Ok(geometry)
}

fn parse_position(value: &Value) -> Result<Position, String> {
    let arr = value.as_array().ok_or("position must be an array")?;
    match (
        arr.first().and_then(Value::as_f64),
        arr.get(1).and_then(Value::as_f64),
    ) {
        (Some(lon), Some(lat)) => Ok(Position::new(lon, lat)),
        _ => Err("position must start with numeric [lon, lat]".to_string()),
    }
}

fn parse_positions(value: &Value) -> Result<Vec<Position>, String> {
    parse_nested(value, parse_position)
}

fn parse_nested<T>(
    value: &Value,
    item: impl Fn(&Value) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    value
        .as_array()
        .ok_or("coordinates must be an array")?
        .iter()
        .map(item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, GeoJsonError, Geometry};
    use serde_json::json;

    fn tract_collection() -> serde_json::Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "GEOID": "25025010100", "name": "Tract 101" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [-71.0, 42.0], [-70.9, 42.0], [-70.9, 42.1], [-71.0, 42.0]
                        ]]
                    }
                },
                {
                    "type": "Feature",
                    "id": 7,
                    "properties": null,
                    "geometry": null
                }
            ]
        })
    }

    #[test]
    fn parses_polygons_and_null_geometry() {
        let fc = FeatureCollection::from_value(&tract_collection()).unwrap();
        assert_eq!(fc.len(), 2);
        match &fc.features[0].geometry {
            Some(Geometry::Polygon(rings)) => assert_eq!(rings[0].len(), 4),
            other => panic!("unexpected geometry: {other:?}"),
        }
        assert_eq!(fc.features[0].property_str("name"), Some("Tract 101"));
        assert_eq!(fc.features[1].id.as_deref(), Some("7"));
        assert!(fc.features[1].geometry.is_none());
        assert!(fc.features[1].properties.is_empty());
    }

    #[test]
    fn missing_feature_list_is_structural_error() {
        let err = FeatureCollection::from_value(&json!({ "type": "FeatureCollection" }))
            .unwrap_err();
        assert!(matches!(err, GeoJsonError::MissingFeatures));

        let err = FeatureCollection::from_value(&json!({ "features": {} })).unwrap_err();
        assert!(matches!(err, GeoJsonError::MissingFeatures));
    }

    #[test]
    fn wrong_root_type_is_rejected() {
        let err = FeatureCollection::from_value(&json!({ "type": "Feature", "features": [] }))
            .unwrap_err();
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));
        let err = FeatureCollection::from_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = FeatureCollection::from_slice(b"{\"type\": \"Feature").unwrap_err();
        assert!(matches!(err, GeoJsonError::Parse(_)));
    }

    #[test]
    fn bad_coordinates_report_feature_index() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                { "geometry": { "type": "Point", "coordinates": [1.0, 2.0] } },
                { "geometry": { "type": "Polygon", "coordinates": "none" } }
            ]
        });
        match FeatureCollection::from_value(&value).unwrap_err() {
            GeoJsonError::InvalidFeature { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("array"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unmodeled_geometry_keeps_the_feature() {
        let collection = json!({
            "type": "GeometryCollection",
            "geometries": [{ "type": "Point", "coordinates": [1.0, 2.0] }]
        });
        let point = json!({ "type": "Point", "coordinates": [0.0, 0.0] });
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                { "properties": { "GEOID": "1" }, "geometry": point },
                { "properties": { "GEOID": "2" }, "geometry": collection.clone() },
                { "properties": { "GEOID": "3" } }
            ]
        });
        let fc = FeatureCollection::from_value(&value).unwrap();
        assert_eq!(fc.len(), 3);
        assert_eq!(fc.unmodeled_geometries(), 1);
        let kept = fc.features[1].geometry.as_ref().unwrap();
        assert_eq!(kept.type_name(), "GeometryCollection");
        assert!(fc.features[2].geometry.is_none());

        assert_eq!(fc.to_value()["features"][1]["geometry"], collection);
    }

    #[test]
    fn emits_feature_collection_value() {
        let fc = FeatureCollection::from_value(&tract_collection()).unwrap();
        let out = fc.to_value();
        assert_eq!(out["type"], "FeatureCollection");
        assert_eq!(out["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(out["features"][0]["geometry"]["coordinates"][0][1], json!([-70.9, 42.0]));
        assert_eq!(out["features"][1]["geometry"], serde_json::Value::Null);

        let reparsed = FeatureCollection::from_value(&out).unwrap();
        assert_eq!(reparsed, fc);
    }
}
