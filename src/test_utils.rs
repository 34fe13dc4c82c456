use std::collections::HashMap;
use std::fmt::Debug;

use petgraph::graph::EdgeIndex;

use super::cost_model::{CostModel, CostParameters, ImpedanceTables};
use super::network::{EdgeCost, FreightNetwork, LinkClass, Mode, NetworkEdge, PhaseOfMatter};


/// Checks that the contents of two hashmaps are the same.
pub fn compare_hashmaps<KK, VV>(query_map: &HashMap<KK, VV>, true_map: &HashMap<KK, VV>)
    where KK: Debug + Eq + std::hash::Hash,
    VV: Debug + PartialEq,
{
    assert_eq!(query_map.len(), true_map.len());

    for (true_key, true_val) in true_map {
        match query_map.get(true_key) {
            Some(val) => assert_eq!(val, true_val, "Value of {:?} differs", true_key),
            None => assert!(false, "Key {:?} missing!", true_key),
        }
    }
}

/// Per-mile rates in the same ballpark as real scenario files.
pub fn test_cost_parameters() -> CostParameters {
    let base_costs = [
        ((PhaseOfMatter::Solid, Mode::Road), 0.2),
        ((PhaseOfMatter::Solid, Mode::Rail), 0.04),
        ((PhaseOfMatter::Solid, Mode::Water), 0.02),
        ((PhaseOfMatter::Liquid, Mode::Road), 0.25),
        ((PhaseOfMatter::Liquid, Mode::Rail), 0.06),
        ((PhaseOfMatter::Liquid, Mode::Water), 0.03),
    ].iter().cloned().collect();
    let transload_costs = [
        (PhaseOfMatter::Solid, 3.0),
        (PhaseOfMatter::Liquid, 2.0),
    ].iter().cloned().collect();
    CostParameters::new(base_costs, transload_costs)
}

pub fn test_cost_model() -> CostModel {
    CostModel::new(test_cost_parameters(), ImpedanceTables::default()).unwrap()
}

/// Adds an edge with neutral impedance.
pub fn add_test_edge(network: &mut FreightNetwork, edge_id: i64, from_id: i64, to_id: i64,
                     mode: Mode, link_class: LinkClass, length: f64) -> EdgeIndex {
    let edge = NetworkEdge::new(edge_id, mode, link_class, length).with_route_cost_scaling(1.0);
    network.add_edge(from_id, to_id, edge).unwrap()
}

/// Overrides the route cost of an edge for every phase, for tests that don't care
/// about the cost model.
pub fn set_route_cost(network: &mut FreightNetwork, edge_id: i64, route_cost: f64) {
    for edge in network.edge_weights_mut() {
        if edge.edge_id == edge_id {
            for phase in PhaseOfMatter::ALL.iter() {
                edge.costs.insert(*phase, EdgeCost { route_cost, transport_cost: route_cost });
            }
        }
    }
}
