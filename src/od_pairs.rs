use std::collections::{HashMap, HashSet};

use itertools::iproduct;
use petgraph::graph::NodeIndex;

use super::catalog::{Catalog, Commodity, Facility, FacilityRole};
use super::network::{FreightNetwork, PhaseOfMatter};


/// Which end of a commodity's OD pairs the shortest path searches start from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteDirection {
    /// one search per origin node, fanning out to its destinations
    SourceRooted,
    /// one backwards search per destination node, fanning in from its origins
    TargetRooted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ODPair {
    pub route_id: u64,
    pub commodity_id: String,
    pub phase_of_matter: PhaseOfMatter,
    pub from_node: i64,
    pub to_node: i64,
    pub from_idx: NodeIndex,
    pub to_idx: NodeIndex,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub from_facility: String,
    pub to_facility: String,
    pub direction: RouteDirection,
}

impl ODPair {
    /// The node the search for this pair is rooted at.
    pub fn root(&self) -> NodeIndex {
        match self.direction {
            RouteDirection::SourceRooted => self.from_idx,
            RouteDirection::TargetRooted => self.to_idx,
        }
    }

    pub fn far_end(&self) -> NodeIndex {
        match self.direction {
            RouteDirection::SourceRooted => self.to_idx,
            RouteDirection::TargetRooted => self.from_idx,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ODPairs {
    pub pairs: Vec<ODPair>,
    /// chosen once per commodity
    pub directions: HashMap<String, RouteDirection>,
}

impl ODPairs {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ODPair> {
        self.pairs.iter()
    }

    pub fn for_commodity<'a>(&'a self, commodity_id: &'a str)
                             -> impl Iterator<Item = &'a ODPair> + 'a {
        self.pairs.iter().filter(move |pair| pair.commodity_id == commodity_id)
    }
}

/// Only processor-to-processor flows may join two facilities of the same role.
pub fn roles_compatible(from_role: FacilityRole, to_role: FacilityRole) -> bool {
    if from_role == FacilityRole::UltimateDestination || to_role == FacilityRole::RawMaterialProducer {
        return false;
    }
    from_role != to_role || from_role == FacilityRole::Processor
}

/// Fewer distinct roots means fewer searches.  A commodity with a max transport
/// distance is always searched from its sources, since the bounded subgraphs are
/// anchored there.
pub fn choose_direction(num_sources: usize, num_targets: usize, has_mtd: bool) -> RouteDirection {
    if !has_mtd && num_targets < num_sources {
        RouteDirection::TargetRooted
    } else {
        RouteDirection::SourceRooted
    }
}

/// The node a facility handles `commodity` at, if it is in the network and reachable
/// by some mode the commodity may use.
fn usable_node(network: &FreightNetwork, facility: &Facility, commodity: &Commodity)
               -> Option<NodeIndex> {
    let idx = match network.get_node_idx_by_id(facility.node_id) {
        Some(idx) => idx,
        None => {
            log::warn!("Facility {} is bound to node {}, which is not in the network",
                       facility.facility_id, facility.node_id);
            return None;
        }
    };
    if !network.modes_at(idx).iter().any(|mode| commodity.allows_mode(mode)) {
        log::debug!("Facility {} has no {} modes at node {}", facility.facility_id,
                    commodity.commodity_id, facility.node_id);
        return None;
    }
    Some(idx)
}

/// Lists every feasible (origin, destination) pair for every commodity.  Route ids
/// count up from 1 in catalog order.
pub fn enumerate_od_pairs(network: &FreightNetwork, catalog: &Catalog) -> ODPairs {
    let mut od_pairs = ODPairs::default();
    let mut next_route_id = 1;

    for commodity in &catalog.commodities {
        let cid = &commodity.commodity_id;
        let origins: Vec<(&Facility, NodeIndex)> = catalog.origin_facilities(cid)
            .filter_map(|ff| usable_node(network, ff, commodity).map(|idx| (ff, idx)))
            .collect();
        let destinations: Vec<(&Facility, NodeIndex)> = catalog.destination_facilities(cid)
            .filter_map(|ff| usable_node(network, ff, commodity).map(|idx| (ff, idx)))
            .collect();

        let valid: Vec<_> = iproduct!(origins.iter(), destinations.iter())
            .filter(|((from, from_idx), (to, to_idx))| {
                from.facility_id != to.facility_id && from_idx != to_idx &&
                    roles_compatible(from.role, to.role)
            })
            .collect();
        if valid.is_empty() {
            log::debug!("No OD pairs for {}", cid);
            continue;
        }

        let sources: HashSet<NodeIndex> = valid.iter().map(|(from, _)| from.1).collect();
        let targets: HashSet<NodeIndex> = valid.iter().map(|(_, to)| to.1).collect();
        let direction = choose_direction(sources.len(), targets.len(),
                                         commodity.max_transport_distance.is_some());
        log::debug!("{}: {} pairs from {} sources to {} targets, {:?}", cid, valid.len(),
                    sources.len(), targets.len(), direction);
        od_pairs.directions.insert(cid.clone(), direction);

        let location = |facility: &Facility, idx: NodeIndex| {
            facility.location_id.clone()
                .or_else(|| network.graph()[idx].location_id.clone())
        };
        for ((from, from_idx), (to, to_idx)) in valid {
            od_pairs.pairs.push(ODPair {
                route_id: next_route_id,
                commodity_id: cid.clone(),
                phase_of_matter: commodity.phase_of_matter,
                from_node: from.node_id,
                to_node: to.node_id,
                from_idx: *from_idx,
                to_idx: *to_idx,
                from_location: location(*from, *from_idx),
                to_location: location(*to, *to_idx),
                from_facility: from.facility_id.clone(),
                to_facility: to.facility_id.clone(),
                direction,
            });
            next_route_id += 1;
        }
    }

    log::info!("Enumerated {} OD pairs for {} commodities", od_pairs.len(),
               od_pairs.directions.len());
    od_pairs
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Io;
    use crate::network::{LinkClass, Mode};
    use crate::test_utils::add_test_edge;

    // road everywhere, plus one rail spur to node 5
    fn small_network() -> FreightNetwork {
        let mut network = FreightNetwork::new();
        for (ii, (from, to)) in [(1, 2), (2, 3), (3, 4), (4, 1), (2, 6), (6, 2)].iter().enumerate() {
            add_test_edge(&mut network, ii as i64, *from, *to, Mode::Road, LinkClass::Network, 1.0);
        }
        add_test_edge(&mut network, 10, 2, 5, Mode::Rail, LinkClass::Network, 1.0);
        network
    }

    fn pair_summary(od_pairs: &ODPairs) -> Vec<(u64, &str, &str, &str)> {
        od_pairs.iter().map(|pair| {
            (pair.route_id, pair.commodity_id.as_str(), pair.from_facility.as_str(),
             pair.to_facility.as_str())
        }).collect()
    }

    #[test]
    fn test_roles_compatible() {
        use FacilityRole::*;
        assert!(roles_compatible(RawMaterialProducer, Processor));
        assert!(roles_compatible(RawMaterialProducer, UltimateDestination));
        assert!(roles_compatible(Processor, UltimateDestination));
        assert!(roles_compatible(Processor, Processor));
        assert!(!roles_compatible(RawMaterialProducer, RawMaterialProducer));
        assert!(!roles_compatible(UltimateDestination, UltimateDestination));
        assert!(!roles_compatible(UltimateDestination, Processor));
        assert!(!roles_compatible(Processor, RawMaterialProducer));
    }

    #[test]
    fn test_supply_chain_pairs() {
        let network = small_network();
        let catalog = Catalog::new(vec![
            Commodity::new("wood", PhaseOfMatter::Solid),
            Commodity::new("lumber", PhaseOfMatter::Solid),
        ], vec![
            Facility::new("forest", FacilityRole::RawMaterialProducer, 1)
                .with_commodity("wood", Io::Output),
            Facility::new("mill", FacilityRole::Processor, 2)
                .with_commodity("wood", Io::Input)
                .with_commodity("lumber", Io::Output),
            Facility::new("store", FacilityRole::UltimateDestination, 3)
                .with_commodity("lumber", Io::Input),
            Facility::new("stove", FacilityRole::UltimateDestination, 4)
                .with_commodity("wood", Io::Input),
        ]);
        let od_pairs = enumerate_od_pairs(&network, &catalog);
        assert_eq!(pair_summary(&od_pairs), vec![
            (1, "wood", "forest", "mill"),
            (2, "wood", "forest", "stove"),
            (3, "lumber", "mill", "store"),
        ]);
        let first = &od_pairs.pairs[0];
        assert_eq!((first.from_node, first.to_node), (1, 2));
        assert_eq!(first.from_idx, network.get_node_idx_by_id(1).unwrap());
        assert_eq!(od_pairs.for_commodity("lumber").count(), 1);
    }

    #[test]
    fn test_processor_to_processor() {
        let network = small_network();
        let catalog = Catalog::new(vec![Commodity::new("pulp", PhaseOfMatter::Liquid)], vec![
            Facility::new("p1", FacilityRole::Processor, 1)
                .with_commodity("pulp", Io::Output),
            Facility::new("p2", FacilityRole::Processor, 2)
                .with_commodity("pulp", Io::Input)
                .with_commodity("pulp", Io::Output),
            // same node as p2
            Facility::new("p3", FacilityRole::Processor, 2)
                .with_commodity("pulp", Io::Input),
        ]);
        let od_pairs = enumerate_od_pairs(&network, &catalog);
        // p2 -> p2 is the same facility and p1 exposes no input
        assert_eq!(pair_summary(&od_pairs), vec![
            (1, "pulp", "p1", "p2"),
            (2, "pulp", "p1", "p3"),
        ]);
    }

    #[test]
    fn test_mode_compatibility() {
        let network = small_network();
        let catalog = Catalog::new(vec![
            Commodity::new("coal", PhaseOfMatter::Solid).with_allowed_modes(&[Mode::Rail]),
        ], vec![
            // node 5 only has a rail edge, node 6 only road
            Facility::new("mine", FacilityRole::RawMaterialProducer, 2)
                .with_commodity("coal", Io::Output),
            Facility::new("plant", FacilityRole::UltimateDestination, 5)
                .with_commodity("coal", Io::Input),
            Facility::new("depot", FacilityRole::UltimateDestination, 6)
                .with_commodity("coal", Io::Input),
            Facility::new("ghost", FacilityRole::UltimateDestination, 77)
                .with_commodity("coal", Io::Input),
        ]);
        let od_pairs = enumerate_od_pairs(&network, &catalog);
        assert_eq!(pair_summary(&od_pairs), vec![(1, "coal", "mine", "plant")]);
    }

    #[test]
    fn test_direction_choice() {
        assert_eq!(choose_direction(3, 1, false), RouteDirection::TargetRooted);
        assert_eq!(choose_direction(3, 1, true), RouteDirection::SourceRooted);
        assert_eq!(choose_direction(1, 3, false), RouteDirection::SourceRooted);
        assert_eq!(choose_direction(2, 2, false), RouteDirection::SourceRooted);

        let network = small_network();
        let facilities = vec![
            Facility::new("f1", FacilityRole::RawMaterialProducer, 1).with_commodity("corn", Io::Output),
            Facility::new("f2", FacilityRole::RawMaterialProducer, 3).with_commodity("corn", Io::Output),
            Facility::new("f3", FacilityRole::RawMaterialProducer, 4).with_commodity("corn", Io::Output),
            Facility::new("elevator", FacilityRole::UltimateDestination, 2)
                .with_commodity("corn", Io::Input),
        ];
        let catalog = Catalog::new(vec![Commodity::new("corn", PhaseOfMatter::Solid)],
                                   facilities.clone());
        let od_pairs = enumerate_od_pairs(&network, &catalog);
        assert_eq!(od_pairs.directions["corn"], RouteDirection::TargetRooted);
        for pair in od_pairs.iter() {
            assert_eq!(pair.root(), network.get_node_idx_by_id(2).unwrap());
        }

        let bounded = Commodity::new("corn", PhaseOfMatter::Solid).with_max_transport_distance(5.0);
        let catalog = Catalog::new(vec![bounded], facilities);
        let od_pairs = enumerate_od_pairs(&network, &catalog);
        assert_eq!(od_pairs.directions["corn"], RouteDirection::SourceRooted);
        assert_eq!(od_pairs.pairs[0].root(), od_pairs.pairs[0].from_idx);
    }
}
