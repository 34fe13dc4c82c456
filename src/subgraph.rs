use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use petgraph::graph::{EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use rayon::prelude::*;

use super::catalog::{Catalog, Commodity};
use super::dijkstra::bounded_dijkstra_with_endcaps;
use super::error::Result;
use super::network::{FreightNetwork, Mode, NetworkEdge};


/// A traversable part of the network.  This is a filter over the shared graph, not
/// a copy of it: an edge belongs to the subgraph if its mode is allowed and both of
/// its endpoints are allowed.
#[derive(Clone, Debug, PartialEq)]
pub struct Subgraph {
    key: String,
    modes: Option<BTreeSet<Mode>>,
    nodes: Option<HashSet<NodeIndex>>,
}

impl Subgraph {
    /// The whole network.
    pub fn full() -> Subgraph {
        Subgraph {
            key: String::from("*"),
            modes: None,
            nodes: None,
        }
    }

    pub fn for_modes(modes: &BTreeSet<Mode>) -> Subgraph {
        Subgraph {
            key: Mode::set_key(modes),
            modes: Some(modes.clone()),
            nodes: None,
        }
    }

    /// Same modes, but only the given nodes.
    pub fn restricted_to(&self, nodes: HashSet<NodeIndex>) -> Subgraph {
        Subgraph {
            key: self.key.clone(),
            modes: self.modes.clone(),
            nodes: Some(nodes),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn modes(&self) -> Option<&BTreeSet<Mode>> {
        self.modes.as_ref()
    }

    pub fn nodes(&self) -> Option<&HashSet<NodeIndex>> {
        self.nodes.as_ref()
    }

    pub fn contains_node(&self, idx: NodeIndex) -> bool {
        match &self.nodes {
            Some(nodes) => nodes.contains(&idx),
            None => true,
        }
    }

    pub fn contains_edge(&self, edge: EdgeReference<NetworkEdge>) -> bool {
        let mode_ok = match &self.modes {
            Some(modes) => modes.contains(&edge.weight().mode),
            None => true,
        };
        mode_ok && self.contains_node(edge.source()) && self.contains_node(edge.target())
    }

    pub fn edges<'a>(&'a self, network: &'a FreightNetwork)
                     -> impl Iterator<Item = EdgeReference<'a, NetworkEdge>> + 'a {
        network.graph().edge_references().filter(move |edge| self.contains_edge(*edge))
    }
}

/// The subgraphs one commodity is routed over.
#[derive(Clone, Debug)]
pub struct SubgraphAssignment {
    /// shared by every commodity with the same allowed modes
    pub mode_subgraph: Arc<Subgraph>,
    /// only for commodities with a max transport distance, keyed by origin node
    pub facility_subgraphs: HashMap<NodeIndex, Arc<Subgraph>>,
}

impl SubgraphAssignment {
    /// The subgraph for a search rooted at `root`.
    pub fn subgraph_for(&self, root: NodeIndex) -> Arc<Subgraph> {
        match self.facility_subgraphs.get(&root) {
            Some(subgraph) => subgraph.clone(),
            None => self.mode_subgraph.clone(),
        }
    }
}

/// An endcap found while bounding a facility's subgraph.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EndcapRecord {
    pub commodity_id: String,
    pub facility_node: i64,
    pub endcap_node: i64,
}

#[derive(Clone, Debug, Default)]
pub struct SubgraphPartition {
    pub assignments: HashMap<String, SubgraphAssignment>,
    pub endcaps: Vec<EndcapRecord>,
}

impl SubgraphPartition {
    pub fn get(&self, commodity_id: &str) -> Option<&SubgraphAssignment> {
        self.assignments.get(commodity_id)
    }

    /// Number of distinct mode subgraphs.
    pub fn num_mode_subgraphs(&self) -> usize {
        let keys: HashSet<&str> = self.assignments.values()
            .map(|assignment| assignment.mode_subgraph.key())
            .collect();
        keys.len()
    }
}

/// Assigns each commodity its mode subgraph, plus a distance-bounded subgraph per
/// origin node when it has a max transport distance.
pub fn partition_subgraphs(network: &FreightNetwork, catalog: &Catalog)
                           -> Result<SubgraphPartition> {
    let mut subgraphs_by_key: HashMap<String, Arc<Subgraph>> = HashMap::new();
    if !catalog.has_mode_restrictions() {
        log::debug!("No mode restrictions, all commodities share the full network");
    }

    let mut assignments = HashMap::new();
    for commodity in &catalog.commodities {
        let mode_subgraph = subgraphs_by_key.entry(commodity.mode_key())
            .or_insert_with(|| match &commodity.allowed_modes {
                Some(modes) => Arc::new(Subgraph::for_modes(modes)),
                None => Arc::new(Subgraph::full()),
            })
            .clone();
        assignments.insert(commodity.commodity_id.clone(), SubgraphAssignment {
            mode_subgraph,
            facility_subgraphs: HashMap::new(),
        });
    }
    log::info!("{} commodities share {} mode subgraphs", catalog.commodities.len(),
               subgraphs_by_key.len());

    // one bounded search per (MTD commodity, origin node)
    let mut searches: Vec<(&Commodity, f64, NodeIndex, Arc<Subgraph>)> = vec![];
    for commodity in &catalog.commodities {
        let mtd = match commodity.max_transport_distance {
            Some(mtd) => mtd,
            None => continue,
        };
        let mode_subgraph = assignments[&commodity.commodity_id].mode_subgraph.clone();
        let origin_nodes: BTreeSet<i64> = catalog.origin_facilities(&commodity.commodity_id)
            .map(|facility| facility.node_id)
            .collect();
        for node_id in origin_nodes {
            match network.get_node_idx_by_id(node_id) {
                Some(idx) => searches.push((commodity, mtd, idx, mode_subgraph.clone())),
                None => log::warn!("Origin node {} of {} is not in the network",
                                   node_id, commodity.commodity_id),
            }
        }
    }

    let bounded: Vec<_> = searches.par_iter()
        .map(|(commodity, mtd, idx, mode_subgraph)|
             -> Result<(String, f64, NodeIndex, Subgraph, Vec<NodeIndex>)> {
            let search = bounded_dijkstra_with_endcaps(
                network.graph(), *idx, *mtd,
                |edge| mode_subgraph.contains_edge(edge),
                |edge| edge.weight().length)?;
            let nodes: HashSet<NodeIndex> = search.distances.keys().cloned().collect();
            Ok((commodity.commodity_id.clone(), *mtd, *idx, mode_subgraph.restricted_to(nodes),
                search.endcaps))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut endcaps = vec![];
    for (commodity_id, mtd, idx, subgraph, facility_endcaps) in bounded {
        let facility_node = network.node_id(idx);
        log::debug!("{} from node {}: {} nodes within {}, {} endcaps", commodity_id,
                    facility_node, subgraph.nodes().map_or(0, |nodes| nodes.len()), mtd,
                    facility_endcaps.len());
        for endcap in facility_endcaps {
            endcaps.push(EndcapRecord {
                commodity_id: commodity_id.clone(),
                facility_node,
                endcap_node: network.node_id(endcap),
            });
        }
        if let Some(assignment) = assignments.get_mut(&commodity_id) {
            assignment.facility_subgraphs.insert(idx, Arc::new(subgraph));
        }
    }

    Ok(SubgraphPartition { assignments, endcaps })
}
