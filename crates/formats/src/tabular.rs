//! Row-oriented CSV sources: tract statistics and auxiliary census tables.

use std::collections::BTreeMap;
use std::fmt;

use foundation::ids::{ID_ALIASES, TractId, first_present_alias};
use foundation::toggles::{InvestorCategory, Year};
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const MEDIAN_RENT_FIELD: &str = "median_rent";
pub const MEDIAN_PRICE_DIFF_FIELD: &str = "median_price_diff";

#[derive(Debug)]
pub enum TabularError {
    Csv(csv::Error),
}

impl fmt::Display for TabularError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabularError::Csv(e) => write!(f, "CSV error: {e}"),
        }
    }
}

impl std::error::Error for TabularError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TabularError::Csv(e) => Some(e),
        }
    }
}

impl From<csv::Error> for TabularError {
    fn from(e: csv::Error) -> Self {
        TabularError::Csv(e)
    }
}

/// One CSV row as header -> raw cell text. Cells are never rewritten.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct RawRow(BTreeMap<String, String>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses `field` as a number, treating blanks and `NA` as absent.
    pub fn number(&self, field: &str) -> Option<f64> {
        parse_number(self.get(field))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Auxiliary census rows are carried through without interpretation.
pub type CensusRow = RawRow;

/// Per-tract eviction and investor statistics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TractRecord {
    pub fields: RawRow,
    /// Canonical join key; `None` until normalized, or when no alias is usable.
    pub normalized_id: Option<TractId>,
}

impl TractRecord {
    pub fn new(fields: RawRow) -> Self {
        Self {
            fields,
            normalized_id: None,
        }
    }

    /// Raw value of the highest-precedence identifier alias present.
    pub fn raw_id(&self) -> Option<&str> {
        first_present_alias(|alias| self.fields.get(alias))
    }

    /// Purchase count for `category`; unusable cells count as zero.
    pub fn investor_count(&self, category: InvestorCategory) -> f64 {
        self.fields
            .number(&category.count_field())
            .unwrap_or(0.0)
    }

    /// Eviction rate for `year`; unusable cells count as zero.
    pub fn eviction_rate(&self, year: Year) -> f64 {
        self.fields
            .number(&year.eviction_rate_field())
            .unwrap_or(0.0)
    }

    /// Median rent, or `None` when not recorded. A rent of zero is a
    /// placeholder in the source data and is treated as not recorded.
    pub fn median_rent(&self) -> Option<f64> {
        self.fields
            .number(MEDIAN_RENT_FIELD)
            .filter(|rent| *rent != 0.0)
    }

    pub fn median_price_diff(&self) -> Option<f64> {
        self.fields.number(MEDIAN_PRICE_DIFF_FIELD)
    }
}

impl Serialize for TractRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (k, v) in self.fields.iter() {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry("normalized_id", &self.normalized_id)?;
        map.end()
    }
}

/// Lenient numeric coercion for CSV cells.
///
/// Blank cells, `NA`/`null`/`NaN` markers and anything that does not parse as a
/// finite number are absent.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    let text = raw?.trim();
    if text.is_empty()
        || text.eq_ignore_ascii_case("na")
        || text.eq_ignore_ascii_case("null")
    {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn read_rows(bytes: &[u8]) -> Result<Vec<RawRow>, TabularError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Ragged rows: cells past the end are absent rather than blank.
        let row: RawRow = headers.iter().zip(record.iter()).collect();
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_tract_records(bytes: &[u8]) -> Result<Vec<TractRecord>, TabularError> {
    Ok(read_rows(bytes)?.into_iter().map(TractRecord::new).collect())
}

pub fn read_census_rows(bytes: &[u8]) -> Result<Vec<CensusRow>, TabularError> {
    read_rows(bytes)
}

/// True when the header row names at least one identifier alias.
pub fn has_identifier_column(row: &RawRow) -> bool {
    ID_ALIASES.iter().any(|alias| row.get(alias).is_some())
}
