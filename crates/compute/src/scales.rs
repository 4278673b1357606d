//! Global axis and colour-scale bounds shared by every view.
//!
//! Bounds are derived once per data load from the full record set so that all
//! charts and maps agree on the same extent, regardless of which year,
//! category or selection is active.

use foundation::toggles::{InvestorCategory, Year};
use formats::tabular::TractRecord;
use serde::Serialize;

use crate::analysis::Statistics;

/// Eviction rates at or above this value are data-entry artifacts.
pub const EVICTION_RATE_CUTOFF: f64 = 1.0;

/// Historical rent range used when no tract reports a rent.
pub const DEFAULT_MEDIAN_RENT_RANGE: (f64, f64) = (394.0, 3501.0);

/// Lower price-differential bound used when no tract reports a value.
pub const DEFAULT_MIN_MEDIAN_PRICE_DIFF: f64 = -46625.0;

/// Fixed upper bound for price differentials. A handful of tracts sit near
/// 400k and would flatten every other point against the axis.
pub const MEDIAN_PRICE_DIFF_CEILING: f64 = 134500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleBounds {
    pub max_investor_count: f64,
    pub max_eviction_rate: f64,
    pub min_median_rent: f64,
    pub max_median_rent: f64,
    pub min_median_price_diff: f64,
    pub max_median_price_diff: f64,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            max_investor_count: 0.0,
            max_eviction_rate: 0.0,
            min_median_rent: DEFAULT_MEDIAN_RENT_RANGE.0,
            max_median_rent: DEFAULT_MEDIAN_RENT_RANGE.1,
            min_median_price_diff: DEFAULT_MIN_MEDIAN_PRICE_DIFF,
            max_median_price_diff: MEDIAN_PRICE_DIFF_CEILING,
        }
    }
}

/// True for eviction rates that may be plotted or used for scaling.
pub fn eviction_rate_in_policy(rate: f64) -> bool {
    rate.is_finite() && rate < EVICTION_RATE_CUTOFF
}

pub fn compute_scale_bounds(records: &[TractRecord]) -> ScaleBounds {
    let max_investor_count = Statistics::max(records.iter().flat_map(|r| {
        InvestorCategory::ALL
            .iter()
            .map(move |category| r.investor_count(*category))
    }))
    .unwrap_or(0.0);

    let max_eviction_rate = Statistics::max(
        records
            .iter()
            .flat_map(|r| Year::ALL.iter().map(move |year| r.eviction_rate(*year)))
            .filter(|rate| eviction_rate_in_policy(*rate)),
    )
    .unwrap_or(0.0);

    let (min_median_rent, max_median_rent) =
        Statistics::min_max(records.iter().filter_map(TractRecord::median_rent))
            .unwrap_or(DEFAULT_MEDIAN_RENT_RANGE);

    let min_median_price_diff =
        Statistics::min_max(records.iter().filter_map(TractRecord::median_price_diff))
            .map(|(min, _)| min)
            .unwrap_or(DEFAULT_MIN_MEDIAN_PRICE_DIFF);

    ScaleBounds {
        max_investor_count,
        max_eviction_rate,
        min_median_rent,
        max_median_rent,
        min_median_price_diff,
        max_median_price_diff: MEDIAN_PRICE_DIFF_CEILING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formats::tabular::read_tract_records;

    fn records(csv: &str) -> Vec<TractRecord> {
        read_tract_records(csv.as_bytes()).unwrap()
    }

    const HEADER: &str = "GEOID,sum_institutional_investor,sum_large_investor,sum_medium_investor,sum_small_investor,eviction_rate_2020,eviction_rate_2021,eviction_rate_2022,eviction_rate_2023,median_rent,median_price_diff";

    #[test]
    fn investor_max_spans_every_category() {
        let rs = records(&format!("{HEADER}\n1,3,9,2,1,0,0,0,0,,\n2,4,1,11,,0,0,0,0,,\n"));
        let bounds = compute_scale_bounds(&rs);
        assert_eq!(bounds.max_investor_count, 11.0);
    }

    #[test]
    fn eviction_max_excludes_rates_at_or_above_one() {
        let rs = records(&format!(
            "{HEADER}\n1,0,0,0,0,0.1,0.3,1.0,0.2,,\n2,0,0,0,0,0.05,1.7,0.25,NA,,\n"
        ));
        let bounds = compute_scale_bounds(&rs);
        assert_eq!(bounds.max_eviction_rate, 0.3);
        assert!(bounds.max_eviction_rate < 1.0);
    }

    #[test]
    fn removing_artifact_rows_does_not_change_eviction_max() {
        let with_artifact = records(&format!(
            "{HEADER}\n1,0,0,0,0,0.1,0.2,0.3,0.4,,\n2,0,0,0,0,1.0,1.5,2.0,3.0,,\n"
        ));
        let without = records(&format!("{HEADER}\n1,0,0,0,0,0.1,0.2,0.3,0.4,,\n"));
        assert_eq!(
            compute_scale_bounds(&with_artifact).max_eviction_rate,
            compute_scale_bounds(&without).max_eviction_rate
        );
    }

    #[test]
    fn all_artifacts_leave_zero_eviction_max() {
        let rs = records(&format!("{HEADER}\n1,0,0,0,0,1,1,1,1,,\n"));
        assert_eq!(compute_scale_bounds(&rs).max_eviction_rate, 0.0);
    }

    #[test]
    fn missing_rents_fall_back_to_default_range() {
        let rs = records(&format!("{HEADER}\n1,0,0,0,0,0,0,0,0,NA,\n2,0,0,0,0,0,0,0,0,,\n"));
        let bounds = compute_scale_bounds(&rs);
        assert_eq!((bounds.min_median_rent, bounds.max_median_rent), (394.0, 3501.0));
    }

    #[test]
    fn rent_range_uses_present_values_only() {
        let rs = records(&format!(
            "{HEADER}\n1,0,0,0,0,0,0,0,0,1200,\n2,0,0,0,0,0,0,0,0,NA,\n3,0,0,0,0,0,0,0,0,2750,\n"
        ));
        let bounds = compute_scale_bounds(&rs);
        assert_eq!((bounds.min_median_rent, bounds.max_median_rent), (1200.0, 2750.0));
    }

    #[test]
    fn price_diff_max_is_policy_ceiling() {
        let rs = records(&format!(
            "{HEADER}\n1,0,0,0,0,0,0,0,0,,-5000\n2,0,0,0,0,0,0,0,0,,420000\n3,0,0,0,0,0,0,0,0,,abc\n"
        ));
        let bounds = compute_scale_bounds(&rs);
        assert_eq!(bounds.min_median_price_diff, -5000.0);
        assert_eq!(bounds.max_median_price_diff, MEDIAN_PRICE_DIFF_CEILING);
    }

    #[test]
    fn empty_input_matches_defaults() {
        assert_eq!(compute_scale_bounds(&[]), ScaleBounds::default());
    }

    #[test]
    fn serializes_with_field_names() {
        let value = serde_json::to_value(ScaleBounds::default()).unwrap();
        assert_eq!(value["max_median_price_diff"], 134500.0);
        assert_eq!(value["min_median_rent"], 394.0);
    }
}
