use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use rayon::prelude::*;

use super::catalog::Catalog;
use super::dijkstra::dijkstra_with_paths;
use super::error::{PresolveError, Result};
use super::materializer::{NoPathRecord, RouteEdge};
use super::network::{FreightNetwork, Mode, PhaseOfMatter};
use super::od_pairs::{ODPairs, RouteDirection};
use super::subgraph::{Subgraph, SubgraphPartition};


/// One shortest path search and everything it has to answer.
#[derive(Clone, Debug)]
pub struct RoutingTask {
    pub commodity_id: String,
    pub phase_of_matter: PhaseOfMatter,
    pub root: NodeIndex,
    pub direction: RouteDirection,
    pub subgraph: Arc<Subgraph>,
    /// used to pick among parallel edges; `None` allows every mode
    pub allowed_modes: Option<BTreeSet<Mode>>,
    /// route ids of the pairs ending at each opposite-end node
    pub targets: BTreeMap<NodeIndex, Vec<u64>>,
}

/// The batch of records one task sends back.
#[derive(Clone, Debug, Default)]
pub struct TaskOutput {
    pub route_edges: Vec<RouteEdge>,
    pub no_paths: Vec<NoPathRecord>,
}

/// Leaves about a quarter of the cpus to the rest of the machine.
pub fn default_worker_count() -> usize {
    std::cmp::max(1, num_cpus::get() * 3 / 4)
}

/// Groups the OD pairs into one task per (commodity, root node).
pub fn build_tasks(od_pairs: &ODPairs, partition: &SubgraphPartition, catalog: &Catalog)
                   -> Vec<RoutingTask> {
    let full_graph = Arc::new(Subgraph::full());
    let mut tasks: Vec<RoutingTask> = vec![];
    let mut task_idxs: HashMap<(&str, NodeIndex), usize> = HashMap::new();

    for pair in od_pairs.iter() {
        let root = pair.root();
        let key = (pair.commodity_id.as_str(), root);
        let task_idx = match task_idxs.get(&key).copied() {
            Some(idx) => idx,
            None => {
                let subgraph = match partition.get(&pair.commodity_id) {
                    Some(assignment) => assignment.subgraph_for(root),
                    None => full_graph.clone(),
                };
                let allowed_modes = catalog.get_commodity(&pair.commodity_id)
                    .and_then(|commodity| commodity.allowed_modes.clone());
                tasks.push(RoutingTask {
                    commodity_id: pair.commodity_id.clone(),
                    phase_of_matter: pair.phase_of_matter,
                    root,
                    direction: pair.direction,
                    subgraph,
                    allowed_modes,
                    targets: BTreeMap::new(),
                });
                task_idxs.insert(key, tasks.len() - 1);
                tasks.len() - 1
            }
        };
        tasks[task_idx].targets.entry(pair.far_end()).or_insert_with(Vec::new).push(pair.route_id);
    }
    log::debug!("Built {} routing tasks for {} OD pairs", tasks.len(), od_pairs.len());
    tasks
}

/// Runs one task's search and walks the path to every reachable opposite-end node.
pub fn run_task(network: &FreightNetwork, task: &RoutingTask) -> Result<TaskOutput> {
    let graph = network.graph();
    let search_direction = match task.direction {
        RouteDirection::SourceRooted => Direction::Outgoing,
        RouteDirection::TargetRooted => Direction::Incoming,
    };
    let goals: HashSet<NodeIndex> = task.targets.keys().cloned().collect();
    let subgraph = &task.subgraph;
    let (costs, tree_edges) = dijkstra_with_paths(
        graph, task.root, search_direction, Some(goals), None,
        |edge| subgraph.contains_edge(edge),
        |edge| edge.weight().route_cost(task.phase_of_matter))?;

    let mut output = TaskOutput::default();
    for (far_end, route_ids) in &task.targets {
        let (source, target) = match task.direction {
            RouteDirection::SourceRooted => (task.root, *far_end),
            RouteDirection::TargetRooted => (*far_end, task.root),
        };
        if !costs.contains_key(far_end) {
            for route_id in route_ids {
                output.no_paths.push(NoPathRecord {
                    source: network.node_id(source),
                    target: network.node_id(target),
                    route_id: *route_id,
                });
            }
            continue;
        }

        // (from, to) hops in travel order
        let mut hops = vec![];
        let mut node = *far_end;
        while node != task.root {
            let edge_idx = match tree_edges.get(&node) {
                Some(edge_idx) => *edge_idx,
                None => return Err(consistency_error(network, task, node, task.root, route_ids)),
            };
            let (edge_source, edge_target) = match graph.edge_endpoints(edge_idx) {
                Some(endpoints) => endpoints,
                None => return Err(consistency_error(network, task, node, task.root, route_ids)),
            };
            hops.push((edge_source, edge_target));
            node = match task.direction {
                RouteDirection::SourceRooted => edge_source,
                RouteDirection::TargetRooted => edge_target,
            };
        }
        if task.direction == RouteDirection::SourceRooted {
            hops.reverse();
        }

        let mut order_index = 0;
        for (from, to) in hops {
            order_index += 1;
            let edge = network.cheapest_edge_between(from, to, task.phase_of_matter,
                                                     task.allowed_modes.as_ref())
                .ok_or_else(|| consistency_error(network, task, from, to, route_ids))?;
            for route_id in route_ids {
                output.route_edges.push(RouteEdge {
                    from_node: network.node_id(from),
                    to_node: network.node_id(to),
                    edge_id: edge.weight().edge_id,
                    route_id: *route_id,
                    order_index,
                });
            }
        }
    }
    Ok(output)
}

fn consistency_error(network: &FreightNetwork, task: &RoutingTask, from: NodeIndex,
                     to: NodeIndex, route_ids: &[u64]) -> PresolveError {
    let modes = match &task.allowed_modes {
        Some(modes) => Mode::set_key(modes),
        None => String::from("*"),
    };
    PresolveError::GraphConsistency {
        from_node: network.node_id(from),
        to_node: network.node_id(to),
        route_id: route_ids.first().copied().unwrap_or_default(),
        modes,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        String::from(*msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("unknown panic")
    }
}

/// Node id of the task's root, or its raw index if the root is not in the graph.
fn root_node_id(network: &FreightNetwork, task: &RoutingTask) -> i64 {
    network.graph().node_weight(task.root)
        .map_or(task.root.index() as i64, |node| node.node_id)
}

fn run_guarded(network: &FreightNetwork, task: &RoutingTask) -> Result<TaskOutput> {
    let root_node = root_node_id(network, task);
    match panic::catch_unwind(AssertUnwindSafe(|| run_task(network, task))) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(PresolveError::WorkerFailure {
            commodity_id: task.commodity_id.clone(),
            root_node,
            source: Box::new(err),
        }),
        Err(payload) => Err(PresolveError::WorkerPanic {
            commodity_id: task.commodity_id.clone(),
            root_node,
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Runs every task on a pool of `num_workers` threads.  Each task returns its own
/// batch; the first failing task aborts the dispatch and nothing is returned.
pub fn dispatch_routes(network: &FreightNetwork, tasks: &[RoutingTask], num_workers: usize)
                       -> Result<Vec<TaskOutput>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .build()
        .map_err(|err| PresolveError::Configuration(format!("cannot start worker pool: {}", err)))?;
    log::info!("Dispatching {} routing tasks to {} workers", tasks.len(), num_workers);

    pool.install(|| {
        tasks.par_iter()
            .map(|task| run_guarded(network, task))
            .collect::<Result<Vec<TaskOutput>>>()
    })
}
