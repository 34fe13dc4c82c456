use std::collections::BTreeSet;
use std::path::Path;

use super::dispatcher::TaskOutput;
use super::error::Result;
use super::network::{FreightNetwork, PhaseOfMatter};
use super::od_pairs::ODPairs;
use super::subgraph::EndcapRecord;


/// One hop of a materialized route.  `order_index` counts up from 1 along the route.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouteEdge {
    pub from_node: i64,
    pub to_node: i64,
    pub edge_id: i64,
    pub route_id: u64,
    pub order_index: u32,
}

/// An OD pair with no path in its subgraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoPathRecord {
    pub source: i64,
    pub target: i64,
    pub route_id: u64,
}

#[derive(Clone, Debug, Default)]
pub struct MaterializedRoutes {
    pub route_edges: Vec<RouteEdge>,
    pub no_paths: Vec<NoPathRecord>,
    /// (from_node, to_node, edge_id) of every edge the optimizer may use
    pub shortest_edges: BTreeSet<(i64, i64, i64)>,
}

/// Merges the batches of all routing tasks.
pub fn materialize<I>(batches: I) -> MaterializedRoutes
    where I: IntoIterator<Item = TaskOutput>
{
    let mut routes = MaterializedRoutes::default();
    for batch in batches {
        routes.route_edges.extend(batch.route_edges);
        routes.no_paths.extend(batch.no_paths);
    }
    routes.route_edges.sort_by_key(|re| (re.route_id, re.order_index));
    routes.no_paths.sort_by_key(|np| np.route_id);
    routes.shortest_edges = routes.route_edges.iter()
        .map(|re| (re.from_node, re.to_node, re.edge_id))
        .collect();
    log::debug!("{} route edges over {} distinct edges", routes.route_edges.len(),
                routes.shortest_edges.len());
    routes
}

/// Without the restriction, every edge is eligible and no routes are computed.
pub fn pass_through(network: &FreightNetwork) -> MaterializedRoutes {
    MaterializedRoutes {
        shortest_edges: network.edge_triples(),
        ..Default::default()
    }
}

fn opt_to_string<T: ToString>(value: Option<T>) -> String {
    match value {
        Some(vv) => vv.to_string(),
        None => String::new(),
    }
}

pub fn write_network_edges(path: &Path, network: &FreightNetwork) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["edge_id", "from_node", "to_node", "link_class", "mode", "length",
                          "route_cost_scaling", "capacity", "volume", "vcr"])?;
    let mut edges: Vec<_> = network.edge_triples().into_iter().collect();
    edges.sort_by_key(|(_, _, edge_id)| *edge_id);
    for (from_node, to_node, edge_id) in edges {
        let edge = match network.get_edge_by_id(edge_id) {
            Some(edge) => edge,
            None => continue,
        };
        writer.write_record(&[
            edge_id.to_string(),
            from_node.to_string(),
            to_node.to_string(),
            edge.link_class.code().to_string(),
            edge.mode.to_string(),
            edge.length.to_string(),
            opt_to_string(edge.route_cost_scaling),
            opt_to_string(edge.attributes.capacity),
            opt_to_string(edge.attributes.volume),
            opt_to_string(edge.attributes.vcr),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_edge_costs(path: &Path, network: &FreightNetwork) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["edge_id", "phase_of_matter", "route_cost", "transport_cost"])?;
    let mut edges: Vec<_> = network.graph().edge_weights().collect();
    edges.sort_by_key(|edge| edge.edge_id);
    for edge in edges {
        for phase in PhaseOfMatter::ALL.iter() {
            if let Some(cost) = edge.costs.get(phase) {
                writer.write_record(&[
                    edge.edge_id.to_string(),
                    phase.to_string(),
                    cost.route_cost.to_string(),
                    cost.transport_cost.to_string(),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_od_pairs(path: &Path, od_pairs: &ODPairs) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["route_id", "from_location", "to_location", "from_facility",
                          "to_facility", "commodity_id", "phase_of_matter", "from_node",
                          "to_node"])?;
    for pair in od_pairs.iter() {
        writer.write_record(&[
            pair.route_id.to_string(),
            opt_to_string(pair.from_location.as_ref()),
            opt_to_string(pair.to_location.as_ref()),
            pair.from_facility.clone(),
            pair.to_facility.clone(),
            pair.commodity_id.clone(),
            pair.phase_of_matter.to_string(),
            pair.from_node.to_string(),
            pair.to_node.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_route_edges(path: &Path, route_edges: &[RouteEdge]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["from_node", "to_node", "edge_id", "route_id", "order_index"])?;
    for re in route_edges {
        writer.write_record(&[
            re.from_node.to_string(),
            re.to_node.to_string(),
            re.edge_id.to_string(),
            re.route_id.to_string(),
            re.order_index.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_shortest_edges(path: &Path, shortest_edges: &BTreeSet<(i64, i64, i64)>)
                            -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["from_node", "to_node", "edge_id"])?;
    for (from_node, to_node, edge_id) in shortest_edges {
        writer.write_record(&[from_node.to_string(), to_node.to_string(), edge_id.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_no_paths(path: &Path, no_paths: &[NoPathRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["source", "target", "route_id"])?;
    for np in no_paths {
        writer.write_record(&[np.source.to_string(), np.target.to_string(),
                              np.route_id.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_endcaps(path: &Path, endcaps: &[EndcapRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["commodity_id", "facility_node", "endcap_node"])?;
    for ec in endcaps {
        writer.write_record(&[ec.commodity_id.clone(), ec.facility_node.to_string(),
                              ec.endcap_node.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
