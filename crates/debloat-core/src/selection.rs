//! The user's current batch of chosen package ids, scoped to exactly one
//! device. Insertion-ordered and duplicate-free; the iteration order here
//! is the order commands are planned in.

use std::collections::HashSet;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<String>,
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership flip. Idempotent under repeated pairs of calls.
    pub fn toggle(&mut self, id: &str) {
        match self.ids.iter().position(|p| p == id) {
            Some(pos) => {
                self.ids.remove(pos);
            }
            None => self.ids.push(id.to_string()),
        }
    }

    /// Replace membership wholesale, keeping the given order and
    /// dropping duplicates.
    pub fn set_many<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.clear();
        let mut seen = HashSet::new();
        for id in ids {
            let id = id.into();
            if seen.insert(id.clone()) {
                self.ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    /// Drop members no longer present in the current inventory, keeping
    /// the relative order of survivors. Returns the removed ids so the
    /// caller can report them. Must run after every inventory refresh and
    /// before any plan is built.
    pub fn prune(&mut self, current_ids: &HashSet<String>) -> Vec<String> {
        let mut removed = Vec::new();
        self.ids.retain(|id| {
            let keep = current_ids.contains(id);
            if !keep {
                removed.push(id.clone());
            }
            keep
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(sel: &SelectionSet) -> Vec<&str> {
        sel.iter().collect()
    }

    #[test]
    fn toggle_flips_membership() {
        let mut sel = SelectionSet::new();
        sel.toggle("a.b.c");
        assert!(sel.contains("a.b.c"));
        sel.toggle("a.b.c");
        assert!(!sel.contains("a.b.c"));
        assert!(sel.is_empty());
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut sel = SelectionSet::new();
        sel.toggle("c.c.c");
        sel.toggle("a.a.a");
        sel.toggle("b.b.b");
        assert_eq!(ids(&sel), vec!["c.c.c", "a.a.a", "b.b.b"]);
    }

    #[test]
    fn set_many_replaces_and_dedups() {
        let mut sel = SelectionSet::new();
        sel.toggle("old.pkg.x");
        sel.set_many(["a.a.a", "b.b.b", "a.a.a"]);
        assert_eq!(ids(&sel), vec!["a.a.a", "b.b.b"]);
    }

    #[test]
    fn prune_is_intersection() {
        let mut sel = SelectionSet::new();
        sel.set_many(["a.a.a", "b.b.b", "c.c.c"]);
        let current: HashSet<String> = ["a.a.a".to_string(), "c.c.c".to_string()].into();

        let removed = sel.prune(&current);
        assert_eq!(removed, vec!["b.b.b".to_string()]);
        assert_eq!(ids(&sel), vec!["a.a.a", "c.c.c"]);
        // prune(S, P) ⊆ P
        assert!(sel.iter().all(|id| current.contains(id)));
    }

    #[test]
    fn prune_against_empty_inventory_empties_selection() {
        let mut sel = SelectionSet::new();
        sel.set_many(["a.a.a"]);
        let removed = sel.prune(&HashSet::new());
        assert_eq!(removed.len(), 1);
        assert!(sel.is_empty());
    }

    #[test]
    fn clear_empties() {
        let mut sel = SelectionSet::new();
        sel.set_many(["a.a.a", "b.b.b"]);
        sel.clear();
        assert!(sel.is_empty());
    }
}
