//! UI-facing toggles that drive the derived views.
//!
//! Every toggle round-trips through the string literal the interaction layer
//! uses (`"2023"`, `"institutional"`, `"median_price_diff"`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseToggleError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseToggleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for ParseToggleError {}

/// Generates `as_str`, `ALL`, `Display`, `FromStr` and `Serialize` for a
/// fieldless toggle enum.
macro_rules! literal_toggle {
    ($ty:ident, $kind:literal, { $($variant:ident => $lit:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $lit),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseToggleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($lit => Ok($ty::$variant),)+
                    other => Err(ParseToggleError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

/// Survey year with per-tract eviction rates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Year {
    Y2020,
    Y2021,
    Y2022,
    #[default]
    Y2023,
}

literal_toggle!(Year, "year", {
    Y2020 => "2020",
    Y2021 => "2021",
    Y2022 => "2022",
    Y2023 => "2023",
});

impl Year {
    /// Column holding this year's eviction rate.
    pub fn eviction_rate_field(self) -> String {
        format!("eviction_rate_{}", self.as_str())
    }
}

/// Buyer scale classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum InvestorCategory {
    #[default]
    Institutional,
    Large,
    Medium,
    Small,
}

literal_toggle!(InvestorCategory, "investor category", {
    Institutional => "institutional",
    Large => "large",
    Medium => "medium",
    Small => "small",
});

impl InvestorCategory {
    /// Column holding the purchase count for this category.
    pub fn count_field(self) -> String {
        format!("sum_{}_investor", self.as_str())
    }
}

/// Secondary indicator plotted against eviction rate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum IndicatorMode {
    #[default]
    MedianRent,
    MedianPriceDiff,
}

literal_toggle!(IndicatorMode, "indicator mode", {
    MedianRent => "median_rent",
    MedianPriceDiff => "median_price_diff",
});

/// Stage of the scrolling narrative currently on screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum NarrativeSection {
    #[default]
    Title,
    Overview,
    Neighborhood1,
    Neighborhood2,
    Conclusion,
}

literal_toggle!(NarrativeSection, "narrative section", {
    Title => "title",
    Overview => "overview",
    Neighborhood1 => "neighborhood1",
    Neighborhood2 => "neighborhood2",
    Conclusion => "conclusion",
});

/// Colour theme of the map layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Investor,
    Indicator,
}

literal_toggle!(Theme, "theme", {
    Investor => "investor",
    Indicator => "indicator",
});

/// Per-layer visibility flags for the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct LayerVisibility {
    pub institutional: bool,
    pub large: bool,
    pub medium: bool,
    pub small: bool,
    pub evictions: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            institutional: true,
            large: false,
            medium: false,
            small: false,
            evictions: true,
        }
    }
}

impl LayerVisibility {
    pub fn investor(&self, category: InvestorCategory) -> bool {
        match category {
            InvestorCategory::Institutional => self.institutional,
            InvestorCategory::Large => self.large,
            InvestorCategory::Medium => self.medium,
            InvestorCategory::Small => self.small,
        }
    }

    pub fn set_investor(&mut self, category: InvestorCategory, visible: bool) {
        match category {
            InvestorCategory::Institutional => self.institutional = visible,
            InvestorCategory::Large => self.large = visible,
            InvestorCategory::Medium => self.medium = visible,
            InvestorCategory::Small => self.small = visible,
        }
    }
}

/// Clamps a scroll position to the `[0, 1]` fraction the narrative expects.
///
/// NaN collapses to the top of the page.
pub fn clamp_scroll_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 1.0)
}
