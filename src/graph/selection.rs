//! Path selection state of a Path Filter node.
//!
//! One boolean per discovered dot path. Toggling cascades: unchecking a
//! path unchecks its descendants, checking a path checks its ancestors.

use crate::metadata::{ancestors, is_descendant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selected / deselected state for every known dot path, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSelection {
    entries: BTreeMap<String, bool>,
}

impl PathSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection with every given path selected.
    pub fn all_selected<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: paths.into_iter().map(|p| (p.into(), true)).collect(),
        }
    }

    /// Replace the known path set. Surviving paths keep their state, new
    /// paths start selected, vanished paths are dropped.
    pub fn refresh<I, S>(&mut self, discovered: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = BTreeMap::new();
        for path in discovered {
            let path = path.into();
            let state = self.entries.get(&path).copied().unwrap_or(true);
            next.insert(path, state);
        }
        self.entries = next;
    }

    /// Flip one path and cascade. Unknown paths are ignored.
    ///
    /// Returns the new state of `path`, or `None` when it is unknown.
    pub fn toggle(&mut self, path: &str) -> Option<bool> {
        let current = *self.entries.get(path)?;
        let next = !current;
        self.entries.insert(path.to_string(), next);

        if next {
            for ancestor in ancestors(path) {
                if let Some(state) = self.entries.get_mut(ancestor) {
                    *state = true;
                }
            }
        } else {
            for (candidate, state) in self.entries.iter_mut() {
                if is_descendant(candidate, path) {
                    *state = false;
                }
            }
        }
        Some(next)
    }

    /// If every path is selected, deselect all; otherwise select all.
    pub fn toggle_all(&mut self) {
        let target = !self.all_are_selected();
        for state in self.entries.values_mut() {
            *state = target;
        }
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.entries.get(path).copied().unwrap_or(false)
    }

    fn all_are_selected(&self) -> bool {
        self.entries.values().all(|s| *s)
    }

    /// Selected paths that have no selected descendant, sorted.
    pub fn leaf_paths(&self) -> Vec<String> {
        let selected: Vec<&String> = self
            .entries
            .iter()
            .filter(|(_, s)| **s)
            .map(|(p, _)| p)
            .collect();

        selected
            .iter()
            .filter(|p| !selected.iter().any(|q| is_descendant(q, p)))
            .map(|p| (*p).clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.entries.values().filter(|s| **s).count()
    }

    /// All known paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PathSelection {
        PathSelection::all_selected(["a", "a.b", "a.b.c", "a.d", "e"])
    }

    #[test]
    fn test_uncheck_cascades_to_descendants() {
        let mut sel = sample();
        assert_eq!(sel.toggle("a"), Some(false));
        assert!(!sel.is_selected("a.b"));
        assert!(!sel.is_selected("a.b.c"));
        assert!(!sel.is_selected("a.d"));
        assert!(sel.is_selected("e"));
    }

    #[test]
    fn test_check_cascades_to_ancestors() {
        let mut sel = sample();
        sel.toggle("a");
        assert_eq!(sel.toggle("a.b.c"), Some(true));
        assert!(sel.is_selected("a"));
        assert!(sel.is_selected("a.b"));
        assert!(!sel.is_selected("a.d"));
    }

    #[test]
    fn test_toggle_unknown_path() {
        let mut sel = sample();
        assert_eq!(sel.toggle("zzz"), None);
        assert_eq!(sel.selected_count(), 5);
    }

    #[test]
    fn test_leaf_paths() {
        let mut sel = sample();
        assert_eq!(sel.leaf_paths(), vec!["a.b.c", "a.d", "e"]);
        sel.toggle("a.b.c");
        assert_eq!(sel.leaf_paths(), vec!["a.b", "a.d", "e"]);
    }

    #[test]
    fn test_refresh_keeps_state_and_drops_vanished() {
        let mut sel = sample();
        sel.toggle("e");
        sel.refresh(["a", "e", "f"]);
        assert_eq!(sel.paths().collect::<Vec<_>>(), vec!["a", "e", "f"]);
        assert!(!sel.is_selected("e"));
        assert!(sel.is_selected("f"));
    }

    #[test]
    fn test_toggle_all() {
        let mut sel = sample();
        sel.toggle_all();
        assert_eq!(sel.selected_count(), 0);
        sel.toggle("e");
        sel.toggle_all();
        assert_eq!(sel.selected_count(), 5);
    }
}
