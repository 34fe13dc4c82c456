use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use glob::glob;
use tempfile::tempdir;

use freight_presolve::{EndcapRecord, Presolve, PresolveResults, ScenarioConfig};


fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(|result| result.unwrap()).collect()
}

/// Expected edge ids of each route; an empty list means no path.
fn read_expected_routes(env_dir: &Path) -> BTreeMap<u64, Vec<i64>> {
    let mut routes = BTreeMap::new();
    for row in read_rows(&env_dir.join("expected_routes.csv")) {
        let route_id = row["route_id"].parse().unwrap();
        let edge_ids = row["edge_ids"].split(';')
            .filter(|ss| !ss.trim().is_empty())
            .map(|ss| ss.trim().parse().unwrap())
            .collect();
        routes.insert(route_id, edge_ids);
    }
    routes
}

fn computed_routes(results: &PresolveResults) -> BTreeMap<u64, Vec<i64>> {
    let mut routes: BTreeMap<u64, Vec<i64>> = BTreeMap::new();
    // route edges come sorted by route and order index
    for re in &results.routes.route_edges {
        routes.entry(re.route_id).or_insert_with(Vec::new).push(re.edge_id);
    }
    routes
}

fn check_route_shapes(results: &PresolveResults) {
    for pair in results.od_pairs.iter() {
        let hops: Vec<_> = results.routes.route_edges.iter()
            .filter(|re| re.route_id == pair.route_id)
            .collect();
        if hops.is_empty() {
            continue;
        }
        for (ii, hop) in hops.iter().enumerate() {
            assert_eq!(hop.order_index as usize, ii + 1);
        }
        assert_eq!(hops[0].from_node, pair.from_node);
        assert_eq!(hops[hops.len() - 1].to_node, pair.to_node);
        for window in hops.windows(2) {
            assert_eq!(window[0].to_node, window[1].from_node);
        }
    }
}

fn run_env(cfg_path: &Path) {
    let env_dir = cfg_path.parent().unwrap();
    println!("Testing {:?}", env_dir);
    let cfg = ScenarioConfig::from_file(cfg_path).unwrap();
    let presolve = Presolve::from_cfg(&cfg).unwrap();
    let results = presolve.run().unwrap();
    let all_edges = presolve.network().edge_triples();

    assert!(results.routes.shortest_edges.is_subset(&all_edges));
    if results.ndr_enabled {
        let expected = read_expected_routes(env_dir);
        let mut routed = computed_routes(&results);
        for (route_id, edge_ids) in &expected {
            if edge_ids.is_empty() {
                assert!(results.routes.no_paths.iter().any(|np| np.route_id == *route_id),
                        "route {} should have no path", route_id);
                routed.entry(*route_id).or_insert_with(Vec::new);
            }
        }
        assert_eq!(routed, expected);
        assert_eq!(results.num_routes() + results.num_unreachable(), results.od_pairs.len());
        check_route_shapes(&results);
    } else {
        assert_eq!(results.routes.shortest_edges, all_edges);
        assert!(results.routes.route_edges.is_empty());
    }

    let expected_endcaps_path = env_dir.join("expected_endcaps.csv");
    if expected_endcaps_path.exists() {
        let expected: Vec<EndcapRecord> = read_rows(&expected_endcaps_path).iter()
            .map(|row| EndcapRecord {
                commodity_id: row["commodity_id"].clone(),
                facility_node: row["facility_node"].parse().unwrap(),
                endcap_node: row["endcap_node"].parse().unwrap(),
            })
            .collect();
        assert_eq!(results.endcaps, expected);
    }

    let out_dir = tempdir().unwrap();
    results.write(presolve.network(), out_dir.path()).unwrap();
    let shortest_rows = read_rows(&out_dir.path().join("shortest_edges.csv"));
    assert_eq!(shortest_rows.len(), results.routes.shortest_edges.len());
    let od_rows = read_rows(&out_dir.path().join("od_pairs.csv"));
    assert_eq!(od_rows.len(), results.od_pairs.len());
    let edge_rows = read_rows(&out_dir.path().join("networkx_edges.csv"));
    assert_eq!(edge_rows.len(), presolve.network().num_edges());
}

#[test]
fn test_scenario_envs() {
    let mut num_envs = 0;
    for path in glob("tests/envs/*/config.yaml").expect("Failed to read glob pattern") {
        run_env(&path.unwrap());
        num_envs += 1;
    }
    assert!(num_envs >= 3);
}

#[test]
fn test_road_rail_details() {
    let cfg = ScenarioConfig::from_file(&PathBuf::from("tests/envs/road-rail/config.yaml")).unwrap();
    let presolve = Presolve::from_cfg(&cfg).unwrap();
    // the self-loop is dropped on load
    assert_eq!(presolve.network().num_edges(), 5);
    let results = presolve.run().unwrap();

    let first = &results.od_pairs.pairs[0];
    assert_eq!(first.from_location.as_deref(), Some("loc_farm"));
    assert_eq!(first.to_facility, "elevator");
    // corn can't use the rail shortcut, coal takes it
    assert!(results.routes.route_edges.iter()
            .all(|re| re.edge_id != 4 || re.route_id == 3));
}

#[test]
fn test_output_dir_override() {
    let cfg_path = PathBuf::from("tests/envs/fan-in-pipeline/config.yaml");
    let cfg = ScenarioConfig::from_file(&cfg_path).unwrap();
    assert!(cfg.output_dir.ends_with("output"));
    let presolve = Presolve::from_cfg(&cfg).unwrap();
    let results = presolve.run().unwrap();
    assert_eq!(results.num_unreachable(), 1);

    let out_dir = tempdir().unwrap();
    let nested = out_dir.path().join("a").join("b");
    results.write(presolve.network(), &nested).unwrap();
    let no_paths = read_rows(&nested.join("no_path_pairs.csv"));
    assert_eq!(no_paths.len(), 1);
    assert_eq!(no_paths[0]["source"], "7");
    assert_eq!(no_paths[0]["target"], "4");
}
