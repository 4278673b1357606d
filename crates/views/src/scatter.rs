//! Investor-count vs. eviction-rate scatter.

use std::collections::BTreeMap;

use compute::analysis::Statistics;
use compute::scales::{ScaleBounds, eviction_rate_in_policy};
use foundation::ids::TractId;
use foundation::toggles::{InvestorCategory, Year};
use formats::tabular::TractRecord;
use serde::Serialize;

use crate::selection::TractSelection;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub id: Option<TractId>,
    pub x: f64,
    pub y: f64,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub id: Option<TractId>,
    pub x: f64,
    pub y: f64,
}

/// Unweighted mean of the plotted points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeanPoint {
    pub x: f64,
    pub y: f64,
}

impl MeanPoint {
    /// Mean of `points`, or the origin when nothing survived filtering.
    pub fn of(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Statistics::mean_xy(points)
            .map(|(x, y)| Self { x, y })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InvestorScatter {
    pub points: Vec<ScatterPoint>,
    pub regional_average: MeanPoint,
    pub max_x: f64,
    pub max_y: f64,
    /// Same mapping for every survey year, ignoring the active year.
    pub trajectories: BTreeMap<Year, Vec<TrajectoryPoint>>,
}

pub fn primary_scatter(
    records: &[TractRecord],
    category: InvestorCategory,
    year: Year,
    selection: &TractSelection,
    scales: &ScaleBounds,
) -> InvestorScatter {
    let points: Vec<ScatterPoint> = records
        .iter()
        .filter_map(|record| {
            let y = record.eviction_rate(year);
            eviction_rate_in_policy(y).then(|| ScatterPoint {
                id: record.normalized_id.clone(),
                x: record.investor_count(category),
                y,
                selected: selection.contains(record.normalized_id.as_ref()),
            })
        })
        .collect();

    let regional_average = MeanPoint::of(points.iter().map(|p| (p.x, p.y)));

    let trajectories = Year::ALL
        .iter()
        .map(|&yr| (yr, trajectory(records, category, yr)))
        .collect();

    InvestorScatter {
        points,
        regional_average,
        max_x: scales.max_investor_count,
        max_y: scales.max_eviction_rate,
        trajectories,
    }
}

fn trajectory(
    records: &[TractRecord],
    category: InvestorCategory,
    year: Year,
) -> Vec<TrajectoryPoint> {
    records
        .iter()
        .filter_map(|record| {
            let y = record.eviction_rate(year);
            eviction_rate_in_policy(y).then(|| TrajectoryPoint {
                id: record.normalized_id.clone(),
                x: record.investor_count(category),
                y,
            })
        })
        .collect()
}
