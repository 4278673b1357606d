//! Attaches canonical tract keys to records and feature properties.

use foundation::ids::{ID_ALIASES, NORMALIZED_ID_FIELD, TractId};
use serde_json::{Map, Value};

use crate::geojson::FeatureCollection;
use crate::tabular::TractRecord;

/// Normalizes a JSON identifier value.
///
/// Integral numbers are rendered without a fractional part so that a tract id
/// stored as `2.5025010100e10` keys the same as the string `"25025010100"`.
pub fn tract_id_from_value(value: &Value) -> Option<TractId> {
    match value {
        Value::String(s) => TractId::normalize(s),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return TractId::normalize(&u.to_string());
            }
            if let Some(i) = n.as_i64() {
                return TractId::normalize(&i.to_string());
            }
            let f = n.as_f64()?;
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e18 {
                TractId::normalize(&format!("{f:.0}"))
            } else {
                TractId::normalize(&n.to_string())
            }
        }
        _ => None,
    }
}

/// Raw value of the first usable identifier alias in a property map.
pub fn first_present_property<'a>(properties: &'a Map<String, Value>) -> Option<&'a Value> {
    ID_ALIASES
        .iter()
        .filter_map(|alias| properties.get(*alias))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

pub fn tract_id_from_properties(properties: &Map<String, Value>) -> Option<TractId> {
    first_present_property(properties).and_then(tract_id_from_value)
}

/// Sets `normalized_id` on every record. Returns how many stayed keyless.
pub fn normalize_records(records: &mut [TractRecord]) -> usize {
    let mut absent = 0;
    for record in records.iter_mut() {
        record.normalized_id = TractId::resolve(|alias| record.fields.get(alias));
        if record.normalized_id.is_none() {
            absent += 1;
        }
    }
    absent
}

/// Writes a `normalized_id` property onto every feature (JSON `null` when no
/// alias is usable). Returns how many features stayed keyless.
pub fn normalize_features(collection: &mut FeatureCollection) -> usize {
    let mut absent = 0;
    for feature in &mut collection.features {
        let key = tract_id_from_properties(&feature.properties);
        let value = match key {
            Some(id) => Value::String(id.into_string()),
            None => {
                absent += 1;
                Value::Null
            }
        };
        feature
            .properties
            .insert(NORMALIZED_ID_FIELD.to_string(), value);
    }
    absent
}
