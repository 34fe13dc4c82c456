// this file defines a struct to represent the freight network: road, rail, water and
// pipeline segments, plus the access links that tie facilities to it and the transfer
// links between modes.  It's a wrapper around a petgraph graph.
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use petgraph::graph::{DiGraph, EdgeIndex, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::catalog::Io;
use super::cost_model::ImpedanceTables;
use super::error::{PresolveError, Result};
use super::io_utils;


/// Weight given to edges that must never win over a finite-cost alternative.
pub const UNROUTABLE_WEIGHT: f64 = 1.0e9;

pub type FreightGraph = DiGraph<NetworkNode, NetworkEdge>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseOfMatter {
    Solid,
    Liquid,
}

impl PhaseOfMatter {
    pub const ALL: [PhaseOfMatter; 2] = [PhaseOfMatter::Solid, PhaseOfMatter::Liquid];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseOfMatter::Solid => "solid",
            PhaseOfMatter::Liquid => "liquid",
        }
    }
}

impl FromStr for PhaseOfMatter {
    type Err = PresolveError;

    fn from_str(ss: &str) -> Result<PhaseOfMatter> {
        match ss.trim().to_lowercase().as_str() {
            "solid" => Ok(PhaseOfMatter::Solid),
            "liquid" => Ok(PhaseOfMatter::Liquid),
            other => Err(PresolveError::Configuration(
                format!("unknown phase of matter '{}'", other))),
        }
    }
}

impl fmt::Display for PhaseOfMatter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport mode of an edge.  Mode names that aren't recognized are kept as `Other`
/// so the cost model can decide what to do with them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    Road,
    Rail,
    Water,
    PipelineCrude,
    PipelineProduct,
    Other(String),
}

impl Mode {
    pub fn known() -> [Mode; 5] {
        [Mode::Road, Mode::Rail, Mode::Water, Mode::PipelineCrude, Mode::PipelineProduct]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Mode::Road => "road",
            Mode::Rail => "rail",
            Mode::Water => "water",
            Mode::PipelineCrude => "pipeline_crude_trf_rts",
            Mode::PipelineProduct => "pipeline_prod_trf_rts",
            Mode::Other(name) => name,
        }
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self, Mode::PipelineCrude | Mode::PipelineProduct)
    }

    /// The key shared by all commodities with the same allowed mode set.
    pub fn set_key(modes: &BTreeSet<Mode>) -> String {
        let mut names: Vec<&str> = modes.iter().map(|mm| mm.as_str()).collect();
        names.sort();
        names.join(",")
    }

    /// Parses a `;`- or `,`-separated list of mode names.
    pub fn parse_list(list: &str) -> BTreeSet<Mode> {
        list.split(|cc| cc == ';' || cc == ',')
            .map(|ss| ss.trim())
            .filter(|ss| !ss.is_empty())
            .map(|ss| match ss.parse::<Mode>() {
                Ok(mode) => mode,
                Err(never) => match never {},
            })
            .collect()
    }
}

impl FromStr for Mode {
    type Err = Infallible;

    fn from_str(ss: &str) -> std::result::Result<Mode, Infallible> {
        let name = ss.trim().to_lowercase();
        let mode = match name.as_str() {
            "road" => Mode::Road,
            "rail" => Mode::Rail,
            "water" => Mode::Water,
            "pipeline_crude_trf_rts" => Mode::PipelineCrude,
            "pipeline_prod_trf_rts" => Mode::PipelineProduct,
            _ => Mode::Other(name),
        };
        Ok(mode)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkClass {
    Network,
    Access,
    Transfer,
}

impl LinkClass {
    pub fn code(&self) -> u8 {
        match self {
            LinkClass::Network => 0,
            LinkClass::Access => 1,
            LinkClass::Transfer => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<LinkClass> {
        match code {
            0 => Some(LinkClass::Network),
            1 => Some(LinkClass::Access),
            2 => Some(LinkClass::Transfer),
            _ => None,
        }
    }
}

impl FromStr for LinkClass {
    type Err = PresolveError;

    fn from_str(ss: &str) -> Result<LinkClass> {
        let ss = ss.trim().to_lowercase();
        let link_class = match ss.parse::<i64>() {
            Ok(code) => LinkClass::from_code(code),
            Err(_) => match ss.as_str() {
                "network" => Some(LinkClass::Network),
                "access" => Some(LinkClass::Access),
                "transfer" => Some(LinkClass::Transfer),
                _ => None,
            },
        };
        link_class.ok_or_else(|| PresolveError::Configuration(format!("unknown link class '{}'", ss)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkNode {
    pub node_id: i64,
    // set when the node is the access point of a facility location
    pub location_id: Option<String>,
    pub location_io: Option<Io>,
}

impl NetworkNode {
    pub fn junction(node_id: i64) -> NetworkNode {
        NetworkNode { node_id, location_id: None, location_io: None }
    }

    pub fn is_facility(&self) -> bool {
        self.location_id.is_some()
    }
}

/// Mode-specific physical attributes.  Only the cost model reads the impedance
/// fields; capacity, volume and vcr are passed through to the optimizer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeAttributes {
    pub functional_class: Option<u8>,
    pub density_code: Option<u8>,
    pub traffic_volume: Option<f64>,
    pub capacity: Option<f64>,
    pub volume: Option<f64>,
    pub vcr: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeCost {
    /// search weight
    pub route_cost: f64,
    /// cost without impedance scaling or short-haul penalties
    pub transport_cost: f64,
}

impl EdgeCost {
    pub fn unroutable() -> EdgeCost {
        EdgeCost { route_cost: UNROUTABLE_WEIGHT, transport_cost: UNROUTABLE_WEIGHT }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkEdge {
    pub edge_id: i64,
    pub mode: Mode,
    pub link_class: LinkClass,
    pub length: f64,
    pub attributes: EdgeAttributes,
    // None until supplied by the input or assigned from the impedance tables
    pub route_cost_scaling: Option<f64>,
    pub costs: HashMap<PhaseOfMatter, EdgeCost>,
}

impl NetworkEdge {
    pub fn new(edge_id: i64, mode: Mode, link_class: LinkClass, length: f64) -> NetworkEdge {
        NetworkEdge {
            edge_id,
            mode,
            link_class,
            length,
            attributes: EdgeAttributes::default(),
            route_cost_scaling: None,
            costs: HashMap::new(),
        }
    }

    pub fn with_route_cost_scaling(mut self, route_cost_scaling: f64) -> NetworkEdge {
        self.route_cost_scaling = Some(route_cost_scaling);
        self
    }

    pub fn with_attributes(mut self, attributes: EdgeAttributes) -> NetworkEdge {
        self.attributes = attributes;
        self
    }

    pub fn route_cost(&self, phase: PhaseOfMatter) -> f64 {
        match self.costs.get(&phase) {
            Some(cost) => cost.route_cost,
            None => UNROUTABLE_WEIGHT,
        }
    }
}

pub struct FreightNetwork {
    graph: FreightGraph,
    node_idxs_by_id: HashMap<i64, NodeIndex>,
    edge_idxs_by_id: HashMap<i64, EdgeIndex>,
}

impl FreightNetwork {
    pub fn new() -> FreightNetwork {
        FreightNetwork {
            graph: DiGraph::new(),
            node_idxs_by_id: HashMap::new(),
            edge_idxs_by_id: HashMap::new(),
        }
    }

    /// Loads the network handed over by the graph builder.  The nodes file is only
    /// needed for facility location tags; nodes referenced by edges are created as
    /// plain junctions.
    pub fn from_csv(edges_path: &Path, nodes_path: Option<&Path>) -> Result<FreightNetwork> {
        let mut network = FreightNetwork::new();

        if let Some(nodes_path) = nodes_path {
            let file = io_utils::file_label(nodes_path);
            for row in io_utils::read_rows(nodes_path)? {
                let node_id = io_utils::parse_required(&row, "node_id", &file)?;
                let location_id = io_utils::get_row_value(&row, "location_id").map(String::from);
                let location_io = io_utils::parse_optional(&row, "location_io", &file)?;
                network.add_node(NetworkNode { node_id, location_id, location_io });
            }
        }

        let file = io_utils::file_label(edges_path);
        for row in io_utils::read_rows(edges_path)? {
            let edge_id = io_utils::parse_required(&row, "edge_id", &file)?;
            let from_id: i64 = io_utils::parse_required(&row, "from_node", &file)?;
            let to_id: i64 = io_utils::parse_required(&row, "to_node", &file)?;
            if from_id == to_id {
                // ignore self-connections
                log::warn!("Ignoring self-loop edge {} at node {}", edge_id, from_id);
                continue;
            }
            let mode = io_utils::parse_required(&row, "mode", &file)?;
            let link_class = io_utils::parse_required(&row, "link_class", &file)?;
            let length = io_utils::parse_required(&row, "length", &file)?;
            let attributes = EdgeAttributes {
                functional_class: io_utils::parse_optional(&row, "functional_class", &file)?,
                density_code: io_utils::parse_optional(&row, "density_code", &file)?,
                traffic_volume: io_utils::parse_optional(&row, "traffic_volume", &file)?,
                capacity: io_utils::parse_optional(&row, "capacity", &file)?,
                volume: io_utils::parse_optional(&row, "volume", &file)?,
                vcr: io_utils::parse_optional(&row, "vcr", &file)?,
            };
            let mut edge = NetworkEdge::new(edge_id, mode, link_class, length)
                .with_attributes(attributes);
            edge.route_cost_scaling = io_utils::parse_optional(&row, "route_cost_scaling", &file)?;
            network.add_edge(from_id, to_id, edge)?;
        }

        let num_facility_nodes = network.graph.node_weights()
            .filter(|node| node.is_facility())
            .count();
        log::info!("Loaded network with {} nodes ({} at facilities) and {} edges",
                   network.num_nodes(), num_facility_nodes, network.num_edges());
        Ok(network)
    }

    /// Adds a node, or updates the location tags of an existing node with the same id.
    pub fn add_node(&mut self, node: NetworkNode) -> NodeIndex {
        if let Some(idx) = self.node_idxs_by_id.get(&node.node_id) {
            let existing = &mut self.graph[*idx];
            if node.location_id.is_some() {
                existing.location_id = node.location_id;
                existing.location_io = node.location_io;
            }
            return *idx;
        }
        let node_id = node.node_id;
        let idx = self.graph.add_node(node);
        self.node_idxs_by_id.insert(node_id, idx);
        idx
    }

    pub fn add_edge(&mut self, from_id: i64, to_id: i64, edge: NetworkEdge) -> Result<EdgeIndex> {
        if self.edge_idxs_by_id.contains_key(&edge.edge_id) {
            return Err(PresolveError::input("network", format!("duplicate edge id {}", edge.edge_id)));
        }
        if edge.length < 0.0 || edge.length.is_nan() {
            return Err(PresolveError::input("network",
                format!("edge {} has invalid length {}", edge.edge_id, edge.length)));
        }
        let from_idx = self.add_node(NetworkNode::junction(from_id));
        let to_idx = self.add_node(NetworkNode::junction(to_id));
        let edge_id = edge.edge_id;
        log::debug!("adding edge {} ({} -> {})", edge_id, from_id, to_id);
        let idx = self.graph.add_edge(from_idx, to_idx, edge);
        self.edge_idxs_by_id.insert(edge_id, idx);
        Ok(idx)
    }

    /// Fills in the route cost scaling of every edge that didn't come with one.
    /// Returns how many edges were assigned.
    pub fn assign_route_cost_scaling(&mut self, impedance: &ImpedanceTables) -> usize {
        let mut num_assigned = 0;
        for edge in self.graph.edge_weights_mut() {
            if edge.route_cost_scaling.is_some() {
                continue;
            }
            edge.route_cost_scaling = impedance.route_cost_scaling(edge);
            if edge.route_cost_scaling.is_none() {
                log::warn!("No route cost scaling for {} edge {}", edge.mode, edge.edge_id);
            }
            num_assigned += 1;
        }
        num_assigned
    }

    pub fn graph(&self) -> &FreightGraph {
        &self.graph
    }

    pub fn edge_weights_mut(&mut self) -> impl Iterator<Item = &mut NetworkEdge> {
        self.graph.edge_weights_mut()
    }

    pub fn get_node_idx_by_id(&self, id: i64) -> Option<NodeIndex> {
        self.node_idxs_by_id.get(&id).copied()
    }

    pub fn get_node_id_by_idx(&self, idx: NodeIndex) -> Option<i64> {
        self.graph.node_weight(idx).map(|node| node.node_id)
    }

    pub fn get_edge_by_id(&self, id: i64) -> Option<&NetworkEdge> {
        match self.edge_idxs_by_id.get(&id) {
            Some(idx) => self.graph.edge_weight(*idx),
            None => None,
        }
    }

    pub(crate) fn node_id(&self, idx: NodeIndex) -> i64 {
        self.graph[idx].node_id
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// All modes of the edges entering or leaving a node.
    pub fn modes_at(&self, idx: NodeIndex) -> BTreeSet<Mode> {
        let outgoing = self.graph.edges_directed(idx, Direction::Outgoing);
        let incoming = self.graph.edges_directed(idx, Direction::Incoming);
        outgoing.chain(incoming).map(|edge| edge.weight().mode.clone()).collect()
    }

    /// Picks the parallel edge from `from` to `to` with the lowest route cost for
    /// `phase` among those whose mode is allowed.  Ties go to the lowest edge id.
    pub fn cheapest_edge_between(&self, from: NodeIndex, to: NodeIndex, phase: PhaseOfMatter,
                                 allowed_modes: Option<&BTreeSet<Mode>>)
                                 -> Option<EdgeReference<NetworkEdge>> {
        self.graph.edges_connecting(from, to)
            .filter(|edge| match allowed_modes {
                Some(modes) => modes.contains(&edge.weight().mode),
                None => true,
            })
            .min_by(|aa, bb| {
                let cost_a = aa.weight().route_cost(phase);
                let cost_b = bb.weight().route_cost(phase);
                cost_a.partial_cmp(&cost_b).unwrap_or(Ordering::Equal)
                    .then(aa.weight().edge_id.cmp(&bb.weight().edge_id))
            })
    }

    /// Every edge as a (from_node, to_node, edge_id) triple.
    pub fn edge_triples(&self) -> BTreeSet<(i64, i64, i64)> {
        self.graph.edge_references().map(|edge| {
            (self.node_id(edge.source()), self.node_id(edge.target()), edge.weight().edge_id)
        }).collect()
    }
}

impl Default for FreightNetwork {
    fn default() -> FreightNetwork {
        FreightNetwork::new()
    }
}
