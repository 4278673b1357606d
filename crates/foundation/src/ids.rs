use std::fmt;

use serde::{Serialize, Serializer};

/// Identifier field names a tract may be keyed by, in precedence order.
pub const ID_ALIASES: [&str; 3] = ["GEOID", "tract_id", "geoid"];

/// Property name under which the canonical key is attached to features.
pub const NORMALIZED_ID_FIELD: &str = "normalized_id";

/// Canonical census-tract join key: a non-empty string of ASCII digits.
///
/// Sources disagree on how tracts are keyed (`"25025010100"`,
/// `"1400000US25025010100"`, a bare JSON number). Every one of them reduces to
/// the same `TractId` once non-digit decoration is stripped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TractId(String);

impl TractId {
    /// Keeps only the ASCII digits of `raw`.
    ///
    /// Returns `None` when nothing usable remains.
    pub fn normalize(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        Some(Self(digits))
    }

    /// Resolves a key from a record exposing several aliases.
    ///
    /// The first alias in [`ID_ALIASES`] whose value is present and non-blank
    /// decides the key; later aliases are never consulted, even when that
    /// value normalizes to nothing.
    pub fn resolve<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Option<Self> {
        first_present_alias(lookup).and_then(Self::normalize)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Returns the raw value of the first non-blank identifier alias.
pub fn first_present_alias<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Option<&'a str> {
    ID_ALIASES
        .iter()
        .filter_map(|alias| lookup(alias))
        .find(|value| !value.trim().is_empty())
}

impl fmt::Display for TractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TractId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for TractId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
