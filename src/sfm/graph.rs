//! Match graph connectivity
//!
//! Views are nodes and matched pairs are edges. Harmonization runs on the
//! largest connected component only; views outside it have no color
//! relation to the reference.

use crate::sfm::{Pair, ViewId};
use std::collections::{BTreeMap, BTreeSet};

/// Undirected graph over views with at least one matched pair
#[derive(Debug, Clone, Default)]
pub struct MatchGraph {
    adjacency: BTreeMap<ViewId, BTreeSet<ViewId>>,
}

impl MatchGraph {
    /// Build the graph from a set of pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> Self {
        let mut adjacency: BTreeMap<ViewId, BTreeSet<ViewId>> = BTreeMap::new();
        for &(a, b) in pairs {
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
        Self { adjacency }
    }

    /// Number of distinct views matched with `view`
    pub fn degree(&self, view: ViewId) -> usize {
        self.adjacency.get(&view).map(BTreeSet::len).unwrap_or(0)
    }

    /// Connected components, each sorted by view id
    pub fn connected_components(&self) -> Vec<BTreeSet<ViewId>> {
        let mut visited = BTreeSet::new();
        let mut components = Vec::new();

        for &start in self.adjacency.keys() {
            if visited.contains(&start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut stack = vec![start];
            visited.insert(start);

            while let Some(view) = stack.pop() {
                component.insert(view);
                for &next in &self.adjacency[&view] {
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
            components.push(component);
        }

        components
    }

    /// Largest connected component; ties go to the one holding the smallest id
    pub fn largest_connected_component(&self) -> BTreeSet<ViewId> {
        // components come out ordered by their smallest id, so the first
        // maximum wins
        let mut best: Option<BTreeSet<ViewId>> = None;
        for component in self.connected_components() {
            if best.as_ref().map_or(true, |b| component.len() > b.len()) {
                best = Some(component);
            }
        }
        best.unwrap_or_default()
    }

    /// View with most neighbors inside `component`; ties go to the smallest id
    pub fn most_connected(&self, component: &BTreeSet<ViewId>) -> Option<ViewId> {
        let mut best: Option<(ViewId, usize)> = None;
        for &view in component {
            let degree = self.degree(view);
            if best.map_or(true, |(_, d)| degree > d) {
                best = Some((view, degree));
            }
        }
        best.map(|(view, _)| view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_largest_component() {
        let pairs = vec![(0, 1), (1, 2), (5, 6), (2, 3)];
        let graph = MatchGraph::from_pairs(&pairs);

        assert_eq!(graph.connected_components().len(), 2);
        let largest = graph.largest_connected_component();
        assert_eq!(largest.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_tie_prefers_smallest_id() {
        let pairs = vec![(4, 5), (1, 2)];
        let graph = MatchGraph::from_pairs(&pairs);
        let largest = graph.largest_connected_component();
        assert!(largest.contains(&1));
    }

    #[test]
    fn test_most_connected() {
        let pairs = vec![(0, 1), (1, 2), (1, 3), (2, 3)];
        let graph = MatchGraph::from_pairs(&pairs);
        let component = graph.largest_connected_component();
        assert_eq!(graph.most_connected(&component), Some(1));
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.degree(42), 0);
    }

    #[test]
    fn test_empty_graph() {
        let graph = MatchGraph::default();
        assert!(graph.largest_connected_component().is_empty());
        assert_eq!(graph.most_connected(&BTreeSet::new()), None);
    }
}
