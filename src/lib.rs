// non-standard crate imports
use log::debug;

// imports of other modules from this crate
mod error;
pub use error::{PresolveError, Result};

mod io_utils;

mod network;
pub use network::{EdgeAttributes, EdgeCost, FreightGraph, FreightNetwork, LinkClass, Mode,
                  NetworkEdge, NetworkNode, PhaseOfMatter, UNROUTABLE_WEIGHT};

mod catalog;
pub use catalog::{Catalog, Commodity, Facility, FacilityRole, Io};

pub mod cost_model;
pub use cost_model::{CostModel, CostParameters, ImpedanceTables};

pub mod edge_weighter;

pub mod dijkstra;

pub mod subgraph;
pub use subgraph::{EndcapRecord, Subgraph, SubgraphAssignment, SubgraphPartition};

pub mod od_pairs;
pub use od_pairs::{ODPair, ODPairs, RouteDirection};

pub mod dispatcher;

pub mod materializer;
pub use materializer::{MaterializedRoutes, NoPathRecord, RouteEdge};

mod config;
pub use config::ScenarioConfig;

mod presolve;
pub use presolve::{Presolve, PresolveResults};

#[cfg(test)]
mod test_utils;


/// Defines the toggles every presolve config provides.
pub trait PresolveConfig {
    fn get_ndr_requested(&self) -> bool;
    fn get_capacity_enforced(&self) -> bool;
    fn get_candidate_generation_active(&self) -> bool;
    fn get_num_workers(&self) -> Option<usize>;

    /// Whether shortest paths are computed at all.  Capacity enforcement, candidate
    /// generation and any max transport distance each force the optimizer onto the
    /// whole network.
    fn effective_ndr(&self, catalog: &Catalog) -> bool {
        let ndr = self.get_ndr_requested() && !self.get_capacity_enforced() &&
            !self.get_candidate_generation_active() && !catalog.has_mtd_commodities();
        if self.get_ndr_requested() && !ndr {
            debug!("Shortest path restriction requested but overridden");
        }
        return ndr;
    }

    /// Candidate generation needs the endcaps of the bounded searches even when no
    /// routes are computed.
    fn needs_bounded_search(&self, catalog: &Catalog) -> bool {
        return self.get_candidate_generation_active() && catalog.has_mtd_commodities();
    }

    fn worker_count(&self) -> usize {
        match self.get_num_workers() {
            Some(num_workers) => std::cmp::max(1, num_workers),
            None => dispatcher::default_worker_count(),
        }
    }
}
