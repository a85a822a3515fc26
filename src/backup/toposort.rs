// ABOUTME: Generic Kahn-style topological sort over an arbitrary node type
// ABOUTME: Produces a deterministic order or reports the nodes stuck in a cycle

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

/// The graph contains a cycle, so no valid order exists.
///
/// `remaining` holds every node that could not be ordered, in input order, to
/// help the operator find the offending dependency loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<T> {
    pub remaining: Vec<T>,
}

impl<T: fmt::Debug> fmt::Display for CycleError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cyclic dependencies among nodes: {:?}", self.remaining)
    }
}

impl<T: fmt::Debug> std::error::Error for CycleError<T> {}

/// Order nodes so that for every edge `a -> b`, `a` appears before `b`.
///
/// `arrows_from` yields each node's outgoing edges (the nodes it depends on).
/// A node is ready when no not-yet-ordered node has an edge into it; ties among
/// equally-ready nodes are broken by input insertion order, so the result is
/// deterministic for a given input.
///
/// Callers wanting dependencies first (e.g. parent tables before children)
/// reverse the result.
///
/// # Errors
///
/// Returns [`CycleError`] when the queue drains while unordered nodes remain —
/// including the degenerate self-edge case.
pub fn topological_sort<T, F, I>(nodes: &[T], mut arrows_from: F) -> Result<Vec<T>, CycleError<T>>
where
    T: Eq + Hash + Clone,
    F: FnMut(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let mut remaining: Vec<T> = nodes.to_vec();

    let mut queue: VecDeque<T> = VecDeque::new();
    for node in &remaining {
        if no_incoming(&remaining, &mut arrows_from, node) {
            queue.push_back(node.clone());
        }
    }

    let mut ordered = Vec::with_capacity(nodes.len());
    let mut seen: HashSet<T> = HashSet::new();

    while let Some(node) = queue.pop_front() {
        if seen.insert(node.clone()) {
            ordered.push(node.clone());
        }
        remaining.retain(|n| n != &node);

        // Removing this node may have unblocked its own targets.
        let targets: Vec<T> = arrows_from(&node).into_iter().collect();
        for target in targets {
            if remaining.contains(&target)
                && !seen.contains(&target)
                && no_incoming(&remaining, &mut arrows_from, &target)
            {
                queue.push_back(target);
            }
        }
    }

    if !remaining.is_empty() {
        return Err(CycleError { remaining });
    }

    Ok(ordered)
}

/// True when no not-yet-ordered node has an edge into `to`.
fn no_incoming<T, F, I>(remaining: &[T], arrows_from: &mut F, to: &T) -> bool
where
    T: Eq,
    F: FnMut(&T) -> I,
    I: IntoIterator<Item = T>,
{
    remaining
        .iter()
        .all(|node| arrows_from(node).into_iter().all(|target| target != *to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sort_graph(nodes: &[&str], edges: &[(&str, &str)]) -> Result<Vec<String>, CycleError<String>> {
        let mut graph: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in edges {
            graph
                .entry(from.to_string())
                .or_default()
                .push(to.to_string());
        }
        let nodes: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
        topological_sort(&nodes, |n| graph.get(n).cloned().unwrap_or_default())
    }

    fn position(order: &[String], node: &str) -> usize {
        order.iter().position(|n| n == node).unwrap()
    }

    #[test]
    fn test_edge_source_precedes_target() {
        let order = sort_graph(
            &["orders", "customers", "items"],
            &[("orders", "customers"), ("items", "orders")],
        )
        .unwrap();

        assert_eq!(order.len(), 3);
        assert!(position(&order, "orders") < position(&order, "customers"));
        assert!(position(&order, "items") < position(&order, "orders"));
    }

    #[test]
    fn test_reverse_gives_dependencies_first() {
        let mut order = sort_graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]).unwrap();
        order.reverse();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_no_edges_preserves_input_order() {
        let order = sort_graph(&["x", "y", "z"], &[]).unwrap();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_empty_input() {
        let order = sort_graph(&[], &[]).unwrap();
        assert!(order.is_empty());
    }

    #[test]
    fn test_cycle_is_an_error() {
        let result = sort_graph(&["a", "b", "c"], &[("a", "b"), ("b", "a")]);
        let err = result.unwrap_err();
        assert!(err.remaining.contains(&"a".to_string()));
        assert!(err.remaining.contains(&"b".to_string()));
    }

    #[test]
    fn test_self_edge_is_a_cycle() {
        let result = sort_graph(&["a"], &[("a", "a")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_cycle_reports_only_stuck_nodes() {
        // "free" has no edges; "a" and "b" form a loop.
        let result = sort_graph(&["free", "a", "b"], &[("a", "b"), ("b", "a")]);
        let err = result.unwrap_err();
        assert!(!err.remaining.contains(&"free".to_string()));
        assert_eq!(err.remaining.len(), 2);
    }

    #[test]
    fn test_diamond_graph() {
        // a -> b, a -> c, b -> d, c -> d
        let order = sort_graph(
            &["d", "c", "b", "a"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        )
        .unwrap();

        assert!(position(&order, "a") < position(&order, "b"));
        assert!(position(&order, "a") < position(&order, "c"));
        assert!(position(&order, "b") < position(&order, "d"));
        assert!(position(&order, "c") < position(&order, "d"));
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let nodes = ["m", "n", "o", "p"];
        let edges = [("m", "o"), ("n", "o"), ("o", "p")];
        let first = sort_graph(&nodes, &edges).unwrap();
        let second = sort_graph(&nodes, &edges).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_works_with_integer_nodes() {
        let nodes = vec![1u32, 2, 3];
        let order = topological_sort(&nodes, |n| if *n == 1 { vec![3u32] } else { vec![] }).unwrap();
        assert!(order.iter().position(|n| *n == 1) < order.iter().position(|n| *n == 3));
    }
}
