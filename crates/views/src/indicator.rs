//! Rent / price-differential vs. eviction-rate scatter.

use compute::scales::{ScaleBounds, eviction_rate_in_policy};
use foundation::toggles::{IndicatorMode, Year};
use formats::tabular::TractRecord;
use serde::Serialize;

use crate::scatter::{MeanPoint, ScatterPoint};
use crate::selection::TractSelection;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IndicatorScatter {
    pub mode: IndicatorMode,
    pub points: Vec<ScatterPoint>,
    pub regional_average: MeanPoint,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

/// Horizontal coordinate for `record`, or `None` to drop the record.
///
/// Price differentials are clamped to the scale ceiling rather than dropped.
fn indicator_value(
    record: &TractRecord,
    mode: IndicatorMode,
    scales: &ScaleBounds,
) -> Option<f64> {
    match mode {
        IndicatorMode::MedianRent => record.median_rent(),
        IndicatorMode::MedianPriceDiff => record
            .median_price_diff()
            .map(|diff| diff.min(scales.max_median_price_diff)),
    }
}

pub fn indicator_scatter(
    records: &[TractRecord],
    mode: IndicatorMode,
    year: Year,
    selection: &TractSelection,
    scales: &ScaleBounds,
) -> IndicatorScatter {
    let points: Vec<ScatterPoint> = records
        .iter()
        .filter_map(|record| {
            let x = indicator_value(record, mode, scales)?;
            let y = record.eviction_rate(year);
            if !eviction_rate_in_policy(y) {
                return None;
            }
            Some(ScatterPoint {
                id: record.normalized_id.clone(),
                x,
                y,
                selected: selection.contains(record.normalized_id.as_ref()),
            })
        })
        .collect();

    let regional_average = MeanPoint::of(points.iter().map(|p| (p.x, p.y)));

    let (min_x, max_x) = match mode {
        IndicatorMode::MedianRent => (scales.min_median_rent, scales.max_median_rent),
        IndicatorMode::MedianPriceDiff => {
            (scales.min_median_price_diff, scales.max_median_price_diff)
        }
    };

    IndicatorScatter {
        mode,
        points,
        regional_average,
        min_x,
        max_x,
        min_y: 0.0,
        max_y: scales.max_eviction_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::scales::{MEDIAN_PRICE_DIFF_CEILING, compute_scale_bounds};
    use foundation::ids::TractId;
    use formats::normalize::normalize_records;
    use formats::tabular::read_tract_records;
    use pretty_assertions::assert_eq;

    fn load(csv: &str) -> (Vec<TractRecord>, ScaleBounds) {
        let mut records = read_tract_records(csv.as_bytes()).unwrap();
        normalize_records(&mut records);
        let scales = compute_scale_bounds(&records);
        (records, scales)
    }

    const SAMPLE: &str = "\
GEOID,median_rent,median_price_diff,eviction_rate_2023
1,1500,-2000,0.05
2,NA,999999,0.10
3,0,abc,0.20
4,2200,,1.4
";

    #[test]
    fn price_diff_is_clamped_to_ceiling() {
        let (records, scales) = load(SAMPLE);
        let view = indicator_scatter(
            &records,
            IndicatorMode::MedianPriceDiff,
            Year::Y2023,
            &TractSelection::new(),
            &scales,
        );
        let xs: Vec<f64> = view.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![-2000.0, MEDIAN_PRICE_DIFF_CEILING]);
        assert_eq!(view.points[1].x, 134500.0);
        assert!(view.points.iter().all(|p| p.x <= MEDIAN_PRICE_DIFF_CEILING));
    }

    #[test]
    fn rent_mode_excludes_missing_and_zero_rents() {
        let (records, scales) = load(SAMPLE);
        let view = indicator_scatter(
            &records,
            IndicatorMode::MedianRent,
            Year::Y2023,
            &TractSelection::new(),
            &scales,
        );
        // Tract 4 has a rent but an artifact eviction rate.
        assert_eq!(view.points.len(), 1);
        assert_eq!(view.points[0].id, TractId::normalize("1"));
        assert_eq!(view.regional_average, MeanPoint { x: 1500.0, y: 0.05 });
    }

    #[test]
    fn reports_mode_appropriate_bounds() {
        let (records, scales) = load(SAMPLE);
        let rent = indicator_scatter(
            &records,
            IndicatorMode::MedianRent,
            Year::Y2023,
            &TractSelection::new(),
            &scales,
        );
        assert_eq!((rent.min_x, rent.max_x), (1500.0, 2200.0));

        let diff = indicator_scatter(
            &records,
            IndicatorMode::MedianPriceDiff,
            Year::Y2023,
            &TractSelection::new(),
            &scales,
        );
        assert_eq!((diff.min_x, diff.max_x), (-2000.0, 134500.0));
        assert_eq!(diff.min_y, 0.0);
        assert_eq!(diff.max_y, scales.max_eviction_rate);
    }

    #[test]
    fn selection_flags_follow_secondary_set() {
        let (records, scales) = load(SAMPLE);
        let selection: TractSelection = TractId::normalize("2").into_iter().collect();
        let view = indicator_scatter(
            &records,
            IndicatorMode::MedianPriceDiff,
            Year::Y2023,
            &selection,
            &scales,
        );
        let flags: Vec<bool> = view.points.iter().map(|p| p.selected).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn no_survivors_average_to_origin() {
        let (records, scales) = load("GEOID,median_rent,eviction_rate_2023\n1,NA,0.1\n");
        let view = indicator_scatter(
            &records,
            IndicatorMode::MedianRent,
            Year::Y2023,
            &TractSelection::new(),
            &scales,
        );
        assert!(view.points.is_empty());
        assert_eq!(view.regional_average, MeanPoint::default());
        assert_eq!((view.min_x, view.max_x), (394.0, 3501.0));
    }
}
