use std::collections::BTreeSet;

use foundation::ids::TractId;
use foundation::toggles::NarrativeSection;
use serde::Serialize;

/// Deterministic set of selected tracts.
///
/// Ordering contract:
/// - Iteration yields ids in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TractSelection {
    ids: BTreeSet<TractId>,
}

impl TractSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Absent keys are never selected.
    pub fn contains(&self, id: Option<&TractId>) -> bool {
        id.is_some_and(|id| self.ids.contains(id))
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, id: TractId) -> bool {
        self.ids.insert(id)
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, id: &TractId) -> bool {
        self.ids.remove(id)
    }

    /// Flips membership of `id`; returns whether it is now selected.
    pub fn toggle(&mut self, id: TractId) -> bool {
        if self.ids.remove(&id) {
            return false;
        }
        self.ids.insert(id);
        true
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            ids: self.ids.union(&other.ids).cloned().collect(),
        }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            ids: self.ids.intersection(&other.ids).cloned().collect(),
        }
    }

    /// Set difference: `self \ other`.
    pub fn diff(&self, other: &Self) -> Self {
        Self {
            ids: self.ids.difference(&other.ids).cloned().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TractId> + '_ {
        self.ids.iter()
    }
}

impl FromIterator<TractId> for TractSelection {
    fn from_iter<I: IntoIterator<Item = TractId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Which neighborhood-focused view a selection belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SelectionView {
    /// Investor-count scatter (first neighborhood chapter).
    Primary,
    /// Rent / price-differential scatter (second neighborhood chapter).
    Secondary,
}

impl SelectionView {
    pub fn for_section(section: NarrativeSection) -> Self {
        match section {
            NarrativeSection::Neighborhood2 => SelectionView::Secondary,
            _ => SelectionView::Primary,
        }
    }
}

/// Selection a section-agnostic consumer (map highlight, hover card) should
/// show while `section` is on screen.
pub fn active_selection(
    section: NarrativeSection,
    primary: &TractSelection,
    secondary: &TractSelection,
) -> TractSelection {
    match SelectionView::for_section(section) {
        SelectionView::Primary => primary.clone(),
        SelectionView::Secondary => secondary.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> TractId {
        TractId::normalize(raw).unwrap()
    }

    fn set(raws: &[&str]) -> TractSelection {
        raws.iter().map(|r| id(r)).collect()
    }

    #[test]
    fn insert_remove_contains_and_len() {
        let mut s = TractSelection::new();
        assert!(s.is_empty());
        assert!(!s.contains(Some(&id("1"))));
        assert!(!s.contains(None));

        assert!(s.insert(id("1")));
        assert!(s.contains(Some(&id("1"))));
        assert!(!s.insert(id("1")));
        assert_eq!(s.len(), 1);

        assert!(s.remove(&id("1")));
        assert!(!s.remove(&id("1")));
        assert!(s.is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut s = TractSelection::new();
        assert!(s.toggle(id("7")));
        assert!(!s.toggle(id("7")));
        assert!(s.is_empty());
    }

    #[test]
    fn iter_is_sorted() {
        let s = set(&["30", "100", "2"]);
        let got: Vec<&str> = s.iter().map(|i| i.as_str()).collect();
        assert_eq!(got, vec!["100", "2", "30"]);
    }

    #[test]
    fn set_ops_union_intersect_diff() {
        let a = set(&["1", "2", "100"]);
        let b = set(&["2", "3", "101"]);
        assert_eq!(a.union(&b), set(&["1", "2", "3", "100", "101"]));
        assert_eq!(a.intersect(&b), set(&["2"]));
        assert_eq!(a.diff(&b), set(&["1", "100"]));
    }

    #[test]
    fn second_neighborhood_section_reads_secondary_set() {
        let primary = set(&["1"]);
        let secondary = set(&["2"]);
        assert_eq!(
            active_selection(NarrativeSection::Neighborhood2, &primary, &secondary),
            secondary
        );
        for section in [
            NarrativeSection::Title,
            NarrativeSection::Overview,
            NarrativeSection::Neighborhood1,
            NarrativeSection::Conclusion,
        ] {
            assert_eq!(active_selection(section, &primary, &secondary), primary);
        }
    }
}
