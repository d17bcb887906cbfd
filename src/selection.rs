//! Checkbox selection over the rows of the current agreement view.

use std::collections::HashSet;

/// Selected agreement ids, scoped to the ids currently visible.
///
/// The header checkbox reads as checked whenever anything is selected, and
/// activating it clears a non-empty selection or selects the whole view
/// when nothing is selected (`toggle_all`).
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selected: HashSet<String>,
    view: HashSet<String>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-scopes the tracker to a freshly projected view. When the set of
    /// visible ids differs from the previous one the selection is cleared
    /// and `true` is returned.
    pub fn scope_to<I, S>(&mut self, ids_in_view: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next: HashSet<String> = ids_in_view.into_iter().map(Into::into).collect();
        if next == self.view {
            return false;
        }
        self.view = next;
        let had_selection = !self.selected.is_empty();
        self.clear();
        if had_selection {
            tracing::debug!(visible = self.view.len(), "view membership changed, selection cleared");
        }
        true
    }

    pub fn select_one(&mut self, id: &str, checked: bool) {
        if checked {
            if self.view.contains(id) {
                self.selected.insert(id.to_string());
            }
        } else {
            self.selected.remove(id);
        }
    }

    /// `checked = true` replaces the selection with exactly `ids_in_view`;
    /// `checked = false` clears it.
    pub fn select_all(&mut self, ids_in_view: &[String], checked: bool) {
        self.selected.clear();
        if checked {
            self.selected.extend(ids_in_view.iter().cloned());
        }
    }

    pub fn toggle_all(&mut self, ids_in_view: &[String]) {
        let checked = !self.all_checked();
        self.select_all(ids_in_view, checked);
    }

    pub fn all_checked(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn selected_ids(&self) -> HashSet<String> {
        self.selected.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionTracker;

    fn view(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn scoped(ids: &[&str]) -> SelectionTracker {
        let mut tracker = SelectionTracker::new();
        tracker.scope_to(view(ids));
        tracker
    }

    #[test]
    fn select_one_is_idempotent() {
        let mut tracker = scoped(&["a", "b"]);
        tracker.select_one("a", true);
        tracker.select_one("a", true);
        assert_eq!(tracker.selected_count(), 1);

        tracker.select_one("b", false);
        tracker.select_one("a", false);
        tracker.select_one("a", false);
        assert_eq!(tracker.selected_count(), 0);
    }

    #[test]
    fn ids_outside_the_view_are_ignored() {
        let mut tracker = scoped(&["a"]);
        tracker.select_one("ghost", true);
        assert!(!tracker.is_selected("ghost"));
        assert_eq!(tracker.selected_count(), 0);
    }

    #[test]
    fn select_all_replaces_prior_selection() {
        let ids = view(&["a", "b", "c"]);
        let mut tracker = scoped(&["a", "b", "c", "d"]);
        tracker.select_one("d", true);
        tracker.select_all(&ids, true);
        assert_eq!(tracker.selected_count(), ids.len());
        assert!(ids.iter().all(|id| tracker.is_selected(id)));
        assert!(!tracker.is_selected("d"));

        tracker.select_all(&ids, false);
        assert_eq!(tracker.selected_count(), 0);
    }

    #[test]
    fn header_toggle_clears_any_partial_selection() {
        let ids = view(&["a", "b", "c"]);
        let mut tracker = scoped(&["a", "b", "c"]);
        assert!(!tracker.all_checked());

        tracker.toggle_all(&ids);
        assert_eq!(tracker.selected_count(), 3);

        tracker.select_one("b", false);
        assert!(tracker.all_checked());
        tracker.toggle_all(&ids);
        assert_eq!(tracker.selected_count(), 0);
    }

    #[test]
    fn membership_change_clears_selection() {
        let ids = view(&["a", "b", "c"]);
        let mut tracker = scoped(&["a", "b", "c"]);
        tracker.select_all(&ids, true);

        assert!(!tracker.scope_to(view(&["c", "b", "a"])));
        assert_eq!(tracker.selected_count(), 3);

        assert!(tracker.scope_to(view(&["a", "b"])));
        assert_eq!(tracker.selected_count(), 0);
    }
}
