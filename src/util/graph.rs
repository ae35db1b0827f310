//! Graph helpers shared by the package resolver and the component composer.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// Find one cycle in `graph`, if any.
///
/// Returned as the node weights along the cycle with the first node repeated
/// at the end (`a -> b -> a`). The cycle starts at the lowest node index of
/// its strongly connected component, so the answer is stable for a given
/// insertion order.
pub fn find_cycle<N: Clone, E>(graph: &DiGraph<N, E>) -> Option<Vec<N>> {
    let mut sccs = tarjan_scc(graph);
    sccs.sort_by_key(|scc| scc.iter().min().copied());

    for scc in sccs {
        let Some(&start) = scc.iter().min() else {
            continue;
        };
        if scc.len() == 1 && !graph.contains_edge(start, start) {
            continue;
        }

        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        if let Some(path) = path_back_to(graph, start, &members) {
            return Some(path.into_iter().map(|i| graph[i].clone()).collect());
        }
    }
    None
}

fn sorted_successors<N, E>(graph: &DiGraph<N, E>, node: NodeIndex) -> Vec<NodeIndex> {
    let mut next: Vec<NodeIndex> = graph.neighbors(node).collect();
    next.sort();
    next.dedup();
    next
}

/// Shortest path `start -> ... -> start` through `members`.
fn path_back_to<N, E>(
    graph: &DiGraph<N, E>,
    start: NodeIndex,
    members: &HashSet<NodeIndex>,
) -> Option<Vec<NodeIndex>> {
    let mut prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for next in sorted_successors(graph, node) {
            if next == start {
                let mut path = vec![node];
                let mut current = node;
                while current != start {
                    current = *prev.get(&current)?;
                    path.push(current);
                }
                path.reverse();
                path.push(start);
                return Some(path);
            }
            if members.contains(&next) && seen.insert(next) {
                prev.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}
