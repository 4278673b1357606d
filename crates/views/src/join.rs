//! Key-based join between tract records and boundary features.

use std::collections::BTreeMap;

use foundation::ids::TractId;
use formats::geojson::FeatureCollection;
use formats::tabular::TractRecord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TractJoin {
    /// Index into the record list.
    pub record: Option<usize>,
    /// Index into the boundary feature list.
    pub boundary: Option<usize>,
}

/// Lookup from canonical key to the record and boundary sharing it.
///
/// Keyless records and features are left out entirely; the first occurrence of
/// a duplicated key wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TractIndex {
    entries: BTreeMap<TractId, TractJoin>,
    keyless_records: usize,
    keyless_boundaries: usize,
}

impl TractIndex {
    pub fn build(records: &[TractRecord], boundaries: &FeatureCollection) -> Self {
        let mut index = Self::default();
        for (i, record) in records.iter().enumerate() {
            match &record.normalized_id {
                Some(id) => {
                    let entry = index.entries.entry(id.clone()).or_default();
                    entry.record.get_or_insert(i);
                }
                None => index.keyless_records += 1,
            }
        }
        for (i, feature) in boundaries.features.iter().enumerate() {
            match feature.normalized_id() {
                Some(id) => {
                    let entry = index.entries.entry(id).or_default();
                    entry.boundary.get_or_insert(i);
                }
                None => index.keyless_boundaries += 1,
            }
        }
        index
    }

    pub fn get(&self, id: &TractId) -> Option<TractJoin> {
        self.entries.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys present on both sides.
    pub fn matched(&self) -> impl Iterator<Item = (&TractId, usize, usize)> + '_ {
        self.entries
            .iter()
            .filter_map(|(id, join)| Some((id, join.record?, join.boundary?)))
    }

    pub fn records_without_boundary(&self) -> usize {
        self.entries
            .values()
            .filter(|j| j.record.is_some() && j.boundary.is_none())
            .count()
    }

    pub fn keyless_records(&self) -> usize {
        self.keyless_records
    }

    pub fn keyless_boundaries(&self) -> usize {
        self.keyless_boundaries
    }
}
