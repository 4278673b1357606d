//! The session-wide state context.
//!
//! `AtlasState` owns every container and the scheduler that keeps derived
//! views current. Construction order is fixed: data containers (scale bounds
//! first), then user selections, then the derived views, which are computed
//! once before `new` returns.
//!
//! All writes go through the `publish_*` / `set_*` methods, which replace one
//! container and flush the scheduler synchronously. Containers are independent:
//! changing the year does not bundle with any other change.

use std::cell::RefCell;

use compute::scales::ScaleBounds;
use formats::geojson::FeatureCollection;
use formats::tabular::{CensusRow, TractRecord};
use foundation::ids::TractId;
use foundation::toggles::{
    IndicatorMode, InvestorCategory, LayerVisibility, NarrativeSection, Theme, Year,
    clamp_scroll_progress,
};
use runtime::{FlushSummary, Job, Observable, ReadOnly, Registry, Scheduler};
use serde::Serialize;

use crate::indicator::{IndicatorScatter, indicator_scatter};
use crate::join::TractIndex;
use crate::scatter::{InvestorScatter, primary_scatter};
use crate::selection::{SelectionView, TractSelection, active_selection};

pub struct AtlasState {
    registry: Registry,
    scheduler: RefCell<Scheduler>,

    scales: Observable<ScaleBounds>,
    records: Observable<Vec<TractRecord>>,
    tract_boundaries: Observable<FeatureCollection>,
    neighborhoods: Observable<FeatureCollection>,
    census: Observable<Vec<CensusRow>>,

    year: Observable<Year>,
    investor_category: Observable<InvestorCategory>,
    indicator_mode: Observable<IndicatorMode>,
    section: Observable<NarrativeSection>,
    layers: Observable<LayerVisibility>,
    scroll_progress: Observable<f64>,
    theme: Observable<Theme>,
    hovered_tract: Observable<Option<TractId>>,
    primary_selection: Observable<TractSelection>,
    secondary_selection: Observable<TractSelection>,

    investor_scatter: ReadOnly<InvestorScatter>,
    indicator_scatter: ReadOnly<IndicatorScatter>,
    active_selection: ReadOnly<TractSelection>,
    tract_index: ReadOnly<TractIndex>,
}

impl Default for AtlasState {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasState {
    pub fn new() -> Self {
        let registry = Registry::new();

        let scales = registry.container("scales", ScaleBounds::default());
        let records = registry.container("records", Vec::new());
        let tract_boundaries = registry.container("tract_boundaries", FeatureCollection::default());
        let neighborhoods = registry.container("neighborhoods", FeatureCollection::default());
        let census = registry.container("census", Vec::new());

        let year = registry.container("year", Year::default());
        let investor_category =
            registry.container("investor_category", InvestorCategory::default());
        let indicator_mode = registry.container("indicator_mode", IndicatorMode::default());
        let section = registry.container("section", NarrativeSection::default());
        let layers = registry.container("layers", LayerVisibility::default());
        let scroll_progress = registry.container("scroll_progress", 0.0);
        let theme = registry.container("theme", Theme::default());
        let hovered_tract = registry.container("hovered_tract", None);
        let primary_selection = registry.container("primary_selection", TractSelection::new());
        let secondary_selection = registry.container("secondary_selection", TractSelection::new());

        let mut scheduler = Scheduler::new(registry.bus());

        let investor_out = registry.container("investor_scatter", InvestorScatter::default());
        scheduler.add_job(Job::derive(
            "investor_scatter",
            vec![
                records.id(),
                investor_category.id(),
                year.id(),
                primary_selection.id(),
                scales.id(),
            ],
            &investor_out,
            {
                let (records, category, year, selection, scales) = (
                    records.clone(),
                    investor_category.clone(),
                    year.clone(),
                    primary_selection.clone(),
                    scales.clone(),
                );
                move || {
                    primary_scatter(
                        &records.get(),
                        *category.get(),
                        *year.get(),
                        &selection.get(),
                        &scales.get(),
                    )
                }
            },
        ));

        let indicator_out = registry.container("indicator_scatter", IndicatorScatter::default());
        scheduler.add_job(Job::derive(
            "indicator_scatter",
            vec![
                records.id(),
                indicator_mode.id(),
                year.id(),
                secondary_selection.id(),
                scales.id(),
            ],
            &indicator_out,
            {
                let (records, mode, year, selection, scales) = (
                    records.clone(),
                    indicator_mode.clone(),
                    year.clone(),
                    secondary_selection.clone(),
                    scales.clone(),
                );
                move || {
                    indicator_scatter(
                        &records.get(),
                        *mode.get(),
                        *year.get(),
                        &selection.get(),
                        &scales.get(),
                    )
                }
            },
        ));

        let active_out = registry.container("active_selection", TractSelection::new());
        scheduler.add_job(Job::derive(
            "active_selection",
            vec![primary_selection.id(), secondary_selection.id(), section.id()],
            &active_out,
            {
                let (primary, secondary, section) = (
                    primary_selection.clone(),
                    secondary_selection.clone(),
                    section.clone(),
                );
                move || active_selection(*section.get(), &primary.get(), &secondary.get())
            },
        ));

        let index_out = registry.container("tract_index", TractIndex::default());
        scheduler.add_job(Job::derive(
            "tract_index",
            vec![records.id(), tract_boundaries.id()],
            &index_out,
            {
                let (records, boundaries) = (records.clone(), tract_boundaries.clone());
                move || TractIndex::build(&records.get(), &boundaries.get())
            },
        ));

        scheduler.run_all();

        Self {
            registry,
            scheduler: RefCell::new(scheduler),
            scales,
            records,
            tract_boundaries,
            neighborhoods,
            census,
            year,
            investor_category,
            indicator_mode,
            section,
            layers,
            scroll_progress,
            theme,
            hovered_tract,
            primary_selection,
            secondary_selection,
            investor_scatter: investor_out.read_only(),
            indicator_scatter: indicator_out.read_only(),
            active_selection: active_out.read_only(),
            tract_index: index_out.read_only(),
        }
    }

    /// Propagates pending changes.
    ///
    /// Returns `None` when called re-entrantly from a subscriber; the flush
    /// already in progress picks those changes up.
    pub fn flush(&self) -> Option<FlushSummary> {
        let mut scheduler = self.scheduler.try_borrow_mut().ok()?;
        Some(scheduler.flush())
    }

    fn write<T: 'static>(&self, container: &Observable<T>, value: T) {
        container.set(value);
        self.flush();
    }

    fn modify<T: Clone + 'static>(&self, container: &Observable<T>, f: impl FnOnce(&mut T)) {
        container.update(f);
        self.flush();
    }

    pub fn container_count(&self) -> usize {
        self.registry.len()
    }

    // Data containers, written by the loader.

    pub fn publish_scales(&self, scales: ScaleBounds) {
        self.write(&self.scales, scales);
    }

    pub fn publish_records(&self, records: Vec<TractRecord>) {
        self.write(&self.records, records);
    }

    pub fn publish_tract_boundaries(&self, boundaries: FeatureCollection) {
        self.write(&self.tract_boundaries, boundaries);
    }

    pub fn publish_neighborhoods(&self, neighborhoods: FeatureCollection) {
        self.write(&self.neighborhoods, neighborhoods);
    }

    pub fn publish_census(&self, rows: Vec<CensusRow>) {
        self.write(&self.census, rows);
    }

    pub fn scales(&self) -> ReadOnly<ScaleBounds> {
        self.scales.read_only()
    }

    pub fn records(&self) -> ReadOnly<Vec<TractRecord>> {
        self.records.read_only()
    }

    pub fn tract_boundaries(&self) -> ReadOnly<FeatureCollection> {
        self.tract_boundaries.read_only()
    }

    pub fn neighborhoods(&self) -> ReadOnly<FeatureCollection> {
        self.neighborhoods.read_only()
    }

    pub fn census(&self) -> ReadOnly<Vec<CensusRow>> {
        self.census.read_only()
    }

    // Interaction state.

    pub fn set_year(&self, year: Year) {
        self.write(&self.year, year);
    }

    pub fn set_investor_category(&self, category: InvestorCategory) {
        self.write(&self.investor_category, category);
    }

    pub fn set_indicator_mode(&self, mode: IndicatorMode) {
        self.write(&self.indicator_mode, mode);
    }

    pub fn set_section(&self, section: NarrativeSection) {
        self.write(&self.section, section);
    }

    pub fn set_layers(&self, layers: LayerVisibility) {
        self.write(&self.layers, layers);
    }

    pub fn set_investor_layer(&self, category: InvestorCategory, visible: bool) {
        self.modify(&self.layers, |layers| layers.set_investor(category, visible));
    }

    pub fn set_evictions_layer(&self, visible: bool) {
        self.modify(&self.layers, |layers| layers.evictions = visible);
    }

    pub fn set_scroll_progress(&self, progress: f64) {
        self.write(&self.scroll_progress, clamp_scroll_progress(progress));
    }

    pub fn set_theme(&self, theme: Theme) {
        self.write(&self.theme, theme);
    }

    pub fn set_hovered_tract(&self, tract: Option<TractId>) {
        self.write(&self.hovered_tract, tract);
    }

    fn selection_container(&self, view: SelectionView) -> &Observable<TractSelection> {
        match view {
            SelectionView::Primary => &self.primary_selection,
            SelectionView::Secondary => &self.secondary_selection,
        }
    }

    pub fn set_selection(&self, view: SelectionView, selection: TractSelection) {
        self.write(self.selection_container(view), selection);
    }

    pub fn update_selection(&self, view: SelectionView, f: impl FnOnce(&mut TractSelection)) {
        self.modify(self.selection_container(view), f);
    }

    /// Flips `tract` in the view's selection; returns whether it is now selected.
    pub fn toggle_tract(&self, view: SelectionView, tract: TractId) -> bool {
        let mut selected = false;
        self.update_selection(view, |s| selected = s.toggle(tract));
        selected
    }

    pub fn year(&self) -> ReadOnly<Year> {
        self.year.read_only()
    }

    pub fn investor_category(&self) -> ReadOnly<InvestorCategory> {
        self.investor_category.read_only()
    }

    pub fn indicator_mode(&self) -> ReadOnly<IndicatorMode> {
        self.indicator_mode.read_only()
    }

    pub fn section(&self) -> ReadOnly<NarrativeSection> {
        self.section.read_only()
    }

    pub fn layers(&self) -> ReadOnly<LayerVisibility> {
        self.layers.read_only()
    }

    pub fn scroll_progress(&self) -> ReadOnly<f64> {
        self.scroll_progress.read_only()
    }

    pub fn theme(&self) -> ReadOnly<Theme> {
        self.theme.read_only()
    }

    pub fn hovered_tract(&self) -> ReadOnly<Option<TractId>> {
        self.hovered_tract.read_only()
    }

    pub fn selection(&self, view: SelectionView) -> ReadOnly<TractSelection> {
        self.selection_container(view).read_only()
    }

    // Derived views.

    pub fn investor_scatter(&self) -> ReadOnly<InvestorScatter> {
        self.investor_scatter.clone()
    }

    pub fn indicator_scatter(&self) -> ReadOnly<IndicatorScatter> {
        self.indicator_scatter.clone()
    }

    pub fn active_selection(&self) -> ReadOnly<TractSelection> {
        self.active_selection.clone()
    }

    pub fn tract_index(&self) -> ReadOnly<TractIndex> {
        self.tract_index.clone()
    }

    /// Current values of everything a renderer consumes.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            year: *self.year.get(),
            investor_category: *self.investor_category.get(),
            indicator_mode: *self.indicator_mode.get(),
            section: *self.section.get(),
            layers: *self.layers.get(),
            scroll_progress: *self.scroll_progress.get(),
            theme: *self.theme.get(),
            scales: *self.scales.get(),
            investor_scatter: (*self.investor_scatter.get()).clone(),
            indicator_scatter: (*self.indicator_scatter.get()).clone(),
            active_selection: (*self.active_selection.get()).clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub year: Year,
    pub investor_category: InvestorCategory,
    pub indicator_mode: IndicatorMode,
    pub section: NarrativeSection,
    pub layers: LayerVisibility,
    pub scroll_progress: f64,
    pub theme: Theme,
    pub scales: ScaleBounds,
    pub investor_scatter: InvestorScatter,
    pub indicator_scatter: IndicatorScatter,
    pub active_selection: TractSelection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::scales::compute_scale_bounds;
    use formats::normalize::normalize_records;
    use formats::tabular::read_tract_records;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    const CSV: &str = "\
GEOID,sum_institutional_investor,sum_large_investor,eviction_rate_2022,eviction_rate_2023,median_rent,median_price_diff
1,5,1,0.30,0.10,1400,500
2,3,8,0.20,1.30,NA,999999
";

    fn loaded() -> AtlasState {
        let state = AtlasState::new();
        let mut records = read_tract_records(CSV.as_bytes()).unwrap();
        normalize_records(&mut records);
        state.publish_scales(compute_scale_bounds(&records));
        state.publish_records(records);
        state
    }

    fn id(raw: &str) -> TractId {
        TractId::normalize(raw).unwrap()
    }

    #[test]
    fn derived_views_exist_before_any_load() {
        let state = AtlasState::new();
        let scatter = state.investor_scatter().get();
        assert!(scatter.points.is_empty());
        assert_eq!(scatter.trajectories.len(), 4);
        assert_eq!(state.indicator_scatter().get().max_x, 3501.0);
        assert!(state.active_selection().get().is_empty());
    }

    #[test]
    fn publishing_records_recomputes_views() {
        let state = loaded();
        let scatter = state.investor_scatter().get();
        // 2023 is the default year; tract 2 has an artifact rate.
        assert_eq!(scatter.points.len(), 1);
        assert_eq!(scatter.points[0].x, 5.0);
        assert_eq!(scatter.max_x, 8.0);
    }

    #[test]
    fn filter_changes_recompute_synchronously() {
        let state = loaded();
        state.set_year(Year::Y2022);
        state.set_investor_category(InvestorCategory::Large);

        let scatter = state.investor_scatter().get();
        let xs: Vec<f64> = scatter.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 8.0]);

        state.set_indicator_mode(IndicatorMode::MedianPriceDiff);
        let indicator = state.indicator_scatter().get();
        let xs: Vec<f64> = indicator.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![500.0, 134500.0]);
    }

    #[test]
    fn selection_flags_track_their_own_view() {
        let state = loaded();
        assert!(state.toggle_tract(SelectionView::Primary, id("1")));

        assert!(state.investor_scatter().get().points[0].selected);
        assert!(!state.indicator_scatter().get().points[0].selected);

        assert!(!state.toggle_tract(SelectionView::Primary, id("1")));
        assert!(!state.investor_scatter().get().points[0].selected);
    }

    #[test]
    fn section_switch_changes_unified_selection_without_mutation() {
        let state = loaded();
        state.set_selection(SelectionView::Primary, [id("1")].into_iter().collect());
        state.set_selection(SelectionView::Secondary, [id("2")].into_iter().collect());
        let primary_version = state.selection(SelectionView::Primary).version();
        let secondary_version = state.selection(SelectionView::Secondary).version();

        assert_eq!(*state.active_selection().get(), [id("1")].into_iter().collect());
        state.set_section(NarrativeSection::Neighborhood2);
        assert_eq!(*state.active_selection().get(), [id("2")].into_iter().collect());
        state.set_section(NarrativeSection::Neighborhood1);
        assert_eq!(*state.active_selection().get(), [id("1")].into_iter().collect());

        assert_eq!(state.selection(SelectionView::Primary).version(), primary_version);
        assert_eq!(state.selection(SelectionView::Secondary).version(), secondary_version);
    }

    #[test]
    fn unrelated_toggles_do_not_recompute_scatter() {
        let state = loaded();
        let before = state.investor_scatter().version();
        state.set_scroll_progress(4.0);
        state.set_theme(Theme::Indicator);
        state.set_evictions_layer(false);
        assert_eq!(state.investor_scatter().version(), before);
        assert_eq!(*state.scroll_progress().get(), 1.0);
        assert!(!state.layers().get().evictions);
    }

    #[test]
    fn subscribers_see_every_recompute() {
        let state = loaded();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        state
            .investor_scatter()
            .subscribe(move |_| counter.set(counter.get() + 1));
        state.set_year(Year::Y2020);
        state.set_year(Year::Y2021);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn writes_from_subscribers_join_the_running_flush() {
        let state = Rc::new(loaded());
        state.set_selection(SelectionView::Primary, [id("1")].into_iter().collect());
        state.set_selection(SelectionView::Secondary, [id("2")].into_iter().collect());

        let weak = Rc::downgrade(&state);
        state.investor_scatter().subscribe(move |_| {
            if let Some(state) = weak.upgrade() {
                if *state.year().get() == Year::Y2020 {
                    state.set_section(NarrativeSection::Neighborhood2);
                }
            }
        });

        state.set_year(Year::Y2020);
        assert_eq!(*state.section().get(), NarrativeSection::Neighborhood2);
        assert_eq!(*state.active_selection().get(), [id("2")].into_iter().collect());
    }

    #[test]
    fn tract_index_follows_boundaries() {
        let state = loaded();
        assert_eq!(state.tract_index().get().records_without_boundary(), 2);
        let mut grid = formats::synthetic::tract_grid_collection(
            &state.records().get(),
            &formats::synthetic::GridLayout::default(),
        );
        formats::normalize::normalize_features(&mut grid);
        state.publish_tract_boundaries(grid);
        assert_eq!(state.tract_index().get().matched().count(), 2);
    }

    #[test]
    fn snapshot_serializes() {
        let state = loaded();
        let value = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(value["year"], "2023");
        assert_eq!(value["indicator_scatter"]["mode"], "median_rent");
        assert_eq!(value["scales"]["max_median_price_diff"], 134500.0);
    }
}
