use std::collections::BTreeSet;

use super::cost_model::CostModel;
use super::error::{PresolveError, Result};
use super::network::{EdgeCost, FreightNetwork, LinkClass, NetworkEdge, PhaseOfMatter};


/// Computes the route and transport cost of one edge for one phase of matter.
pub fn edge_cost(model: &CostModel, edge: &NetworkEdge, phase: PhaseOfMatter) -> Result<EdgeCost> {
    // solids never move by pipeline, but the edge stays in the graph
    if phase == PhaseOfMatter::Solid && edge.mode.is_pipeline() {
        return Ok(EdgeCost::unroutable());
    }

    match edge.link_class {
        LinkClass::Transfer => {
            // a transload has an inbound and an outbound transfer edge
            let half = model.cost(phase, &edge.mode, LinkClass::Transfer)? / 2.0;
            Ok(EdgeCost { route_cost: half, transport_cost: half })
        }
        LinkClass::Network if edge.mode.is_pipeline() => {
            let tariff = get_route_cost_scaling(edge)?;
            Ok(EdgeCost { route_cost: tariff, transport_cost: tariff })
        }
        LinkClass::Access if edge.mode.is_pipeline() => {
            let penalty = model.short_haul_penalty(phase, &edge.mode)?;
            Ok(EdgeCost { route_cost: penalty, transport_cost: penalty })
        }
        link_class => {
            let scaling = get_route_cost_scaling(edge)?;
            let base_cost = model.cost(phase, &edge.mode, link_class)?;
            let mut route_cost = edge.length * scaling * base_cost;
            if link_class == LinkClass::Access {
                // zero for road
                route_cost += model.short_haul_penalty(phase, &edge.mode)? / 2.0;
            }
            Ok(EdgeCost { route_cost, transport_cost: edge.length * base_cost })
        }
    }
}

fn get_route_cost_scaling(edge: &NetworkEdge) -> Result<f64> {
    edge.route_cost_scaling.ok_or_else(|| PresolveError::Configuration(
        format!("{} edge {} has no route cost scaling", edge.mode, edge.edge_id)))
}

/// Sets the per-phase costs of every edge.  Edges the cost model can't price keep the
/// unroutable weight.  Costs are overwritten, so re-running on a weighted network
/// gives the same result.
pub fn weight_edges(network: &mut FreightNetwork, model: &CostModel,
                    phases: &BTreeSet<PhaseOfMatter>) -> Result<()> {
    let mut num_unpriced = 0;
    for edge in network.edge_weights_mut() {
        for phase in phases {
            let cost = match edge_cost(model, edge, *phase) {
                Ok(cost) => cost,
                Err(err) => {
                    log::warn!("Leaving edge {} unroutable for {}: {}", edge.edge_id, phase, err);
                    num_unpriced += 1;
                    EdgeCost::unroutable()
                }
            };
            edge.costs.insert(*phase, cost);
        }
    }
    if num_unpriced > 0 {
        log::warn!("{} edge costs could not be priced", num_unpriced);
    }
    log::debug!("weighted {} edges for {} phases of matter", network.num_edges(), phases.len());
    validate_weights(network)
}

/// Search assumes non-negative weights, so anything else is rejected here.
pub fn validate_weights(network: &FreightNetwork) -> Result<()> {
    for edge in network.graph().edge_weights() {
        for (phase, cost) in &edge.costs {
            // also catches NaN
            if !(cost.route_cost >= 0.0) {
                return Err(PresolveError::Configuration(format!(
                    "edge {} has invalid {} weight {}", edge.edge_id, phase, cost.route_cost)));
            }
        }
    }
    Ok(())
}
