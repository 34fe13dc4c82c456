use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::PresolveConfig;
use super::catalog::Catalog;
use super::config::ScenarioConfig;
use super::cost_model::CostModel;
use super::dispatcher::{build_tasks, dispatch_routes};
use super::edge_weighter::weight_edges;
use super::error::Result;
use super::materializer::{self, MaterializedRoutes};
use super::network::FreightNetwork;
use super::od_pairs::{enumerate_od_pairs, ODPairs};
use super::subgraph::{partition_subgraphs, EndcapRecord};


/// A weighted network and catalog, ready to compute the shortest path restriction.
pub struct Presolve {
    network: FreightNetwork,
    catalog: Catalog,
    ndr_enabled: bool,
    bounded_search: bool,
    num_workers: usize,
}

pub struct PresolveResults {
    pub od_pairs: ODPairs,
    pub routes: MaterializedRoutes,
    pub endcaps: Vec<EndcapRecord>,
    pub ndr_enabled: bool,
}

impl PresolveResults {
    pub fn num_unreachable(&self) -> usize {
        self.routes.no_paths.len()
    }

    pub fn num_routes(&self) -> usize {
        let route_ids: BTreeSet<u64> = self.routes.route_edges.iter()
            .map(|re| re.route_id)
            .collect();
        route_ids.len()
    }

    /// Writes every output table into `output_dir`, creating it if needed.
    pub fn write(&self, network: &FreightNetwork, output_dir: &Path) -> Result<()> {
        fs::create_dir_all(output_dir)?;
        materializer::write_network_edges(&output_dir.join("networkx_edges.csv"), network)?;
        materializer::write_edge_costs(&output_dir.join("networkx_edge_costs.csv"), network)?;
        materializer::write_od_pairs(&output_dir.join("od_pairs.csv"), &self.od_pairs)?;
        materializer::write_route_edges(&output_dir.join("route_edges.csv"),
                                        &self.routes.route_edges)?;
        materializer::write_shortest_edges(&output_dir.join("shortest_edges.csv"),
                                           &self.routes.shortest_edges)?;
        materializer::write_no_paths(&output_dir.join("no_path_pairs.csv"), &self.routes.no_paths)?;
        materializer::write_endcaps(&output_dir.join("endcaps.csv"), &self.endcaps)?;
        log::info!("Wrote presolve tables to {}", output_dir.display());
        Ok(())
    }
}

impl Presolve {
    /// Loads the network and catalog named in the config.
    pub fn from_cfg(cfg: &ScenarioConfig) -> Result<Presolve> {
        let network = FreightNetwork::from_csv(&cfg.edges_path, cfg.nodes_path.as_deref())?;
        let catalog = Catalog::from_csv(&cfg.commodities_path, &cfg.facilities_path)?;
        let cost_model = CostModel::new(cfg.cost_params.clone(), cfg.impedance.clone())?;
        Presolve::new(network, catalog, &cost_model, cfg)
    }

    /// Assigns route cost scaling and weights every edge.  Fails if any weight is
    /// unusable, before any search has run.
    pub fn new(mut network: FreightNetwork, catalog: Catalog, cost_model: &CostModel,
               cfg: &dyn PresolveConfig) -> Result<Presolve> {
        let num_assigned = network.assign_route_cost_scaling(cost_model.impedance());
        log::debug!("assigned route cost scaling to {} edges", num_assigned);
        weight_edges(&mut network, cost_model, &catalog.phases())?;

        let ndr_enabled = cfg.effective_ndr(&catalog);
        let bounded_search = cfg.needs_bounded_search(&catalog);
        log::info!("Shortest path restriction is {}", if ndr_enabled { "on" } else { "off" });
        Ok(Presolve {
            network,
            catalog,
            ndr_enabled,
            bounded_search,
            num_workers: cfg.worker_count(),
        })
    }

    pub fn network(&self) -> &FreightNetwork {
        &self.network
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn run(&self) -> Result<PresolveResults> {
        let od_pairs = enumerate_od_pairs(&self.network, &self.catalog);
        for commodity in &self.catalog.commodities {
            log::debug!("{}: {} OD pairs", commodity.commodity_id,
                        od_pairs.for_commodity(&commodity.commodity_id).count());
        }

        let (routes, endcaps) = if self.ndr_enabled {
            let partition = partition_subgraphs(&self.network, &self.catalog)?;
            log::debug!("Routing over {} mode subgraphs", partition.num_mode_subgraphs());
            let tasks = build_tasks(&od_pairs, &partition, &self.catalog);
            let batches = dispatch_routes(&self.network, &tasks, self.num_workers)?;
            (materializer::materialize(batches), partition.endcaps)
        } else {
            // no search needed, but candidate generation still wants the endcaps
            let endcaps = if self.bounded_search {
                partition_subgraphs(&self.network, &self.catalog)?.endcaps
            } else {
                vec![]
            };
            (materializer::pass_through(&self.network), endcaps)
        };

        let results = PresolveResults { od_pairs, routes, endcaps, ndr_enabled: self.ndr_enabled };
        if results.num_unreachable() > 0 {
            log::warn!("{} of {} OD pairs have no path", results.num_unreachable(),
                       results.od_pairs.len());
        } else {
            log::info!("All {} OD pairs are routable", results.od_pairs.len());
        }
        log::info!("{} routes use {} of {} edges", results.num_routes(),
                   results.routes.shortest_edges.len(), self.network.num_edges());
        Ok(results)
    }
}


#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::catalog::{Commodity, Facility, FacilityRole, Io};
    use crate::cost_model::ImpedanceTables;
    use crate::error::PresolveError;
    use crate::io_utils::read_rows;
    use crate::network::{LinkClass, Mode, NetworkEdge, PhaseOfMatter};
    use crate::test_utils::{test_cost_model, test_cost_parameters};

    struct DummyConfig {
        ndr: bool,
        candidate_generation: bool,
    }

    impl PresolveConfig for DummyConfig {
        fn get_ndr_requested(&self) -> bool {
            self.ndr
        }
        fn get_capacity_enforced(&self) -> bool {
            false
        }
        fn get_candidate_generation_active(&self) -> bool {
            self.candidate_generation
        }
        fn get_num_workers(&self) -> Option<usize> {
            Some(2)
        }
    }

    // no route cost scaling given, so the impedance tables fill it in
    fn network() -> FreightNetwork {
        let mut network = FreightNetwork::new();
        let edges = [
            (1, 1, 2, Mode::Road, LinkClass::Network, 10.0),
            (2, 2, 3, Mode::Road, LinkClass::Network, 10.0),
            (3, 1, 3, Mode::Rail, LinkClass::Network, 15.0),
            (4, 3, 4, Mode::Road, LinkClass::Network, 10.0),
            (5, 5, 6, Mode::Road, LinkClass::Network, 10.0),
        ];
        for (edge_id, from, to, mode, link_class, length) in edges.iter() {
            let edge = NetworkEdge::new(*edge_id, mode.clone(), *link_class, *length);
            network.add_edge(*from, *to, edge).unwrap();
        }
        network
    }

    fn catalog(mtd: Option<f64>) -> Catalog {
        let mut corn = Commodity::new("corn", PhaseOfMatter::Solid).with_allowed_modes(&[Mode::Road]);
        corn.max_transport_distance = mtd;
        Catalog::new(vec![corn], vec![
            Facility::new("farm", FacilityRole::RawMaterialProducer, 1).with_commodity("corn", Io::Output),
            Facility::new("mill", FacilityRole::Processor, 4).with_commodity("corn", Io::Input),
            Facility::new("island", FacilityRole::UltimateDestination, 6)
                .with_commodity("corn", Io::Input),
        ])
    }

    #[test]
    fn test_run_with_restriction() {
        let cfg = DummyConfig { ndr: true, candidate_generation: false };
        let presolve = Presolve::new(network(), catalog(None), &test_cost_model(), &cfg).unwrap();
        assert_eq!(presolve.network().get_edge_by_id(1).unwrap().route_cost_scaling, Some(1.0));
        let results = presolve.run().unwrap();

        assert!(results.ndr_enabled);
        assert_eq!(results.od_pairs.len(), 2);
        assert_eq!(results.num_routes(), 1);
        assert_eq!(results.num_unreachable(), 1);
        assert_eq!(results.routes.no_paths[0].target, 6);
        let expected: BTreeSet<(i64, i64, i64)> =
            [(1, 2, 1), (2, 3, 2), (3, 4, 4)].iter().cloned().collect();
        assert_eq!(results.routes.shortest_edges, expected);
        assert!(results.routes.shortest_edges.is_subset(&presolve.network().edge_triples()));
    }

    #[test]
    fn test_run_without_restriction() {
        let cfg = DummyConfig { ndr: false, candidate_generation: false };
        let presolve = Presolve::new(network(), catalog(None), &test_cost_model(), &cfg).unwrap();
        let results = presolve.run().unwrap();
        assert!(!results.ndr_enabled);
        assert_eq!(results.routes.shortest_edges, presolve.network().edge_triples());
        assert!(results.routes.route_edges.is_empty());
        assert_eq!(results.num_unreachable(), 0);
    }

    #[test]
    fn test_mtd_forces_full_network_with_endcaps() {
        let cfg = DummyConfig { ndr: true, candidate_generation: true };
        let presolve = Presolve::new(network(), catalog(Some(15.0)), &test_cost_model(), &cfg)
            .unwrap();
        let results = presolve.run().unwrap();
        assert!(!results.ndr_enabled);
        assert_eq!(results.routes.shortest_edges.len(), 5);
        assert_eq!(results.endcaps, vec![EndcapRecord {
            commodity_id: String::from("corn"),
            facility_node: 1,
            endcap_node: 2,
        }]);

        // without candidate generation nobody needs the endcaps
        let cfg = DummyConfig { ndr: true, candidate_generation: false };
        let presolve = Presolve::new(network(), catalog(Some(15.0)), &test_cost_model(), &cfg)
            .unwrap();
        assert!(presolve.run().unwrap().endcaps.is_empty());
    }

    #[test]
    fn test_negative_weights_fail_before_search() {
        let mut params = test_cost_parameters();
        params.base_costs.insert((PhaseOfMatter::Solid, Mode::Rail), 10.0);
        let model = CostModel::new(params, ImpedanceTables::default()).unwrap();
        let mut network = network();
        network.add_edge(4, 7, NetworkEdge::new(9, Mode::Rail, LinkClass::Access, 0.1)
            .with_route_cost_scaling(1.0)).unwrap();
        let cfg = DummyConfig { ndr: true, candidate_generation: false };
        match Presolve::new(network, catalog(None), &model, &cfg) {
            Err(PresolveError::Configuration(_)) => (),
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("negative weight was accepted"),
        }
    }

    #[test]
    fn test_write_results() {
        let dir = tempdir().unwrap();
        let cfg = DummyConfig { ndr: true, candidate_generation: false };
        let presolve = Presolve::new(network(), catalog(None), &test_cost_model(), &cfg).unwrap();
        let results = presolve.run().unwrap();
        let output_dir = dir.path().join("out");
        results.write(presolve.network(), &output_dir).unwrap();

        for file in ["networkx_edges.csv", "networkx_edge_costs.csv", "od_pairs.csv",
                     "route_edges.csv", "shortest_edges.csv", "no_path_pairs.csv",
                     "endcaps.csv"].iter() {
            assert!(output_dir.join(file).exists(), "{} missing", file);
        }
        let costs = read_rows(&output_dir.join("networkx_edge_costs.csv")).unwrap();
        // only the solid phase is in the catalog
        assert_eq!(costs.len(), 5);
        let od_rows = read_rows(&output_dir.join("od_pairs.csv")).unwrap();
        assert_eq!(od_rows[0]["from_facility"], "farm");
        assert_eq!(od_rows[1]["to_node"], "6");
    }
}
