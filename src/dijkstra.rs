use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::cmp::Ordering;

use petgraph::Direction;
use petgraph::algo::Measure;
use petgraph::graph::{EdgeIndex, EdgeReference, NodeIndex};
use petgraph::visit::{EdgeRef, VisitMap, Visitable};

use super::error::{PresolveError, Result};
use super::network::{FreightGraph, NetworkEdge};
type GG = FreightGraph;


/// Dijkstra rooted at a single node, searching either forwards from a source
/// (`Direction::Outgoing`) or backwards from a target (`Direction::Incoming`).  Based
/// on the implementation in the petgraph library.
///
/// Only edges accepted by `edge_filter` are traversed, and if `used_nodes` is given
/// only those nodes (plus the root) are entered.  If `goals` is not `None`, the search
/// stops once every goal node has been settled; scores of nodes that were still on
/// the frontier at that point are tentative.
///
/// Edge costs must be non-negative; a negative (or NaN) cost is an error.
///
/// Returns two `HashMap`s: first maps each reached node to its path cost, and second
/// maps each reached node to the edge that links it towards the root on the shortest
/// path tree.
pub fn dijkstra_with_paths<F, P, K>(
    graph: &GG,
    root: NodeIndex,
    direction: Direction,
    mut goals: Option<HashSet<NodeIndex>>,
    used_nodes: Option<&HashSet<NodeIndex>>,
    mut edge_filter: P,
    mut edge_cost: F,
) -> Result<(HashMap<NodeIndex, K>, HashMap<NodeIndex, EdgeIndex>)>
where
    F: FnMut(EdgeReference<NetworkEdge>) -> K,
    P: FnMut(EdgeReference<NetworkEdge>) -> bool,
    K: Measure + Copy,
{
    let mut visited = graph.visit_map();
    let mut scores = HashMap::new();
    let mut edges_used = HashMap::new();
    let zero_score = K::default();
    scores.insert(root, zero_score);

    let mut counter = 0;
    let mut visit_next = BinaryHeap::new();
    visit_next.push(MinScored(zero_score, counter, root));
    while let Some(MinScored(node_score, _, node)) = visit_next.pop() {
        if visited.is_visited(&node) {
            continue;
        }
        if let Some(goals) = &mut goals {
            goals.remove(&node);
            if goals.is_empty() {
                break;
            }
        }
        for edge in graph.edges_directed(node, direction) {
            if !edge_filter(edge) {
                continue;
            }
            let next = match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            };
            if visited.is_visited(&next) {
                continue;
            }
            match used_nodes {
                // check if we're supposed to ignore this node
                Some(used_nodes) if !used_nodes.contains(&next) => continue,
                _ => (),
            }
            let cost = edge_cost(edge);
            if !(cost >= zero_score) {
                return Err(negative_weight(graph, edge, format!("edge cost {:?}", cost)));
            }
            let next_score = node_score + cost;
            match scores.entry(next) {
                Occupied(ent) => {
                    if next_score < *ent.get() {
                        *ent.into_mut() = next_score;
                        counter += 1;
                        visit_next.push(MinScored(next_score, counter, next));
                        edges_used.insert(next, edge.id());
                    }
                }
                Vacant(ent) => {
                    ent.insert(next_score);
                    counter += 1;
                    visit_next.push(MinScored(next_score, counter, next));
                    edges_used.insert(next, edge.id());
                }
            }
        }
        visited.visit(node);
    }
    Ok((scores, edges_used))
}

#[derive(Clone, Debug)]
pub struct BoundedSearch<K> {
    /// final distance of every node within the cutoff
    pub distances: HashMap<NodeIndex, K>,
    /// nodes beyond which nothing more is reachable within the cutoff, in the order
    /// they were settled
    pub endcaps: Vec<NodeIndex>,
}

/// Forward Dijkstra from `source` that never relaxes an edge taking the distance past
/// `cutoff`.  A settled node that relaxed no neighbour but had at least one neighbour
/// rejected by the cutoff is an endcap.
///
/// Labels with equal distance are settled in the order they were pushed.  Finding a
/// shorter distance to an already settled node means some edge cost is negative,
/// which is an error.
pub fn bounded_dijkstra_with_endcaps<F, P, K>(
    graph: &GG,
    source: NodeIndex,
    cutoff: K,
    mut edge_filter: P,
    mut edge_cost: F,
) -> Result<BoundedSearch<K>>
where
    F: FnMut(EdgeReference<NetworkEdge>) -> K,
    P: FnMut(EdgeReference<NetworkEdge>) -> bool,
    K: Measure + Copy,
{
    let mut distances: HashMap<NodeIndex, K> = HashMap::new();
    let mut seen: HashMap<NodeIndex, K> = HashMap::new();
    let mut endcaps = vec![];
    let zero_score = K::default();
    seen.insert(source, zero_score);

    let mut counter = 0;
    let mut fringe = BinaryHeap::new();
    fringe.push(MinScored(zero_score, counter, source));
    while let Some(MinScored(dist, _, node)) = fringe.pop() {
        if distances.contains_key(&node) {
            // already settled
            continue;
        }
        distances.insert(node, dist);

        let mut num_relaxed = 0;
        let mut too_far = 0;
        for edge in graph.edges_directed(node, Direction::Outgoing) {
            if !edge_filter(edge) {
                continue;
            }
            let next = edge.target();
            let cost = edge_cost(edge);
            if !(cost >= zero_score) {
                return Err(negative_weight(graph, edge, format!("edge cost {:?}", cost)));
            }
            let next_dist = dist + cost;
            if next_dist > cutoff {
                too_far += 1;
                continue;
            }
            if let Some(settled) = distances.get(&next) {
                if next_dist < *settled {
                    return Err(negative_weight(graph, edge, format!(
                        "distance {:?} undercuts settled distance {:?}", next_dist, settled)));
                }
                continue;
            }
            let improves = match seen.get(&next) {
                Some(prev_dist) => next_dist < *prev_dist,
                None => true,
            };
            if improves {
                seen.insert(next, next_dist);
                counter += 1;
                fringe.push(MinScored(next_dist, counter, next));
                num_relaxed += 1;
            }
        }
        if num_relaxed == 0 && too_far > 0 {
            endcaps.push(node);
        }
    }
    Ok(BoundedSearch { distances, endcaps })
}

fn negative_weight(graph: &GG, edge: EdgeReference<NetworkEdge>, detail: String) -> PresolveError {
    PresolveError::NegativeWeight {
        from_node: graph[edge.source()].node_id,
        to_node: graph[edge.target()].node_id,
        detail: format!("edge {}: {}", edge.weight().edge_id, detail),
    }
}


/// Min-heap entry: lowest score first, then lowest insertion number.
#[derive(Copy, Clone, Debug)]
pub struct MinScored<K, T>(pub K, pub usize, pub T);

impl<K: PartialOrd, T> PartialEq for MinScored<K, T> {
    #[inline]
    fn eq(&self, other: &MinScored<K, T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd, T> Eq for MinScored<K, T> {}

impl<K: PartialOrd, T> PartialOrd for MinScored<K, T> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K, T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd, T> Ord for MinScored<K, T> {
    #[inline]
    fn cmp(&self, other: &MinScored<K, T>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        let by_score = if a == b {
            Ordering::Equal
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // these are the NaN cases
            Ordering::Equal
        } else if a.ne(a) {
            // Order NaN less, so that it is last in the MinScore order
            Ordering::Less
        } else {
            Ordering::Greater
        };
        // earlier insertions come out first
        by_score.then_with(|| other.1.cmp(&self.1))
    }
}
