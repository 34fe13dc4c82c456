use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use yaml_rust::{Yaml, YamlLoader};

use super::PresolveConfig;
use super::cost_model::{CostParameters, ImpedanceTables};
use super::error::{PresolveError, Result};
use super::io_utils::str_to_absolute_path;
use super::network::{Mode, PhaseOfMatter};


/// Everything a presolve run is configured by, as read from a scenario yaml file.
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub edges_path: PathBuf,
    pub nodes_path: Option<PathBuf>,
    pub commodities_path: PathBuf,
    pub facilities_path: PathBuf,
    pub output_dir: PathBuf,
    pub ndr_enabled: bool,
    pub capacity_enforced: bool,
    pub candidate_generation_active: bool,
    pub num_workers: Option<usize>,
    pub cost_params: CostParameters,
    pub impedance: ImpedanceTables,
}

fn config_error(detail: String) -> PresolveError {
    PresolveError::Configuration(detail)
}

/// Integer or real.
fn yaml_number(value: &Yaml) -> Option<f64> {
    match value {
        Yaml::Integer(ii) => Some(*ii as f64),
        Yaml::Real(_) => value.as_f64(),
        _ => None,
    }
}

fn yaml_key(key: &Yaml) -> Option<String> {
    match key {
        Yaml::String(ss) => Some(ss.clone()),
        Yaml::Integer(ii) => Some(ii.to_string()),
        _ => None,
    }
}

fn required_path(yaml_cfg: &Yaml, section: &str, key: &str, base_dir: &Path) -> Result<PathBuf> {
    match yaml_cfg[section][key].as_str() {
        Some(path) => Ok(str_to_absolute_path(path, base_dir)),
        None => Err(config_error(format!("no {}.{} in config", section, key))),
    }
}

fn optional_bool(yaml_cfg: &Yaml, key: &str, default: bool) -> Result<bool> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(default);
    }
    value.as_bool().ok_or_else(|| config_error(format!("{} must be true or false", key)))
}

fn optional_number(yaml_cfg: &Yaml, key: &str) -> Result<Option<f64>> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    match yaml_number(value) {
        Some(number) => Ok(Some(number)),
        None => Err(config_error(format!("{} must be a number", key))),
    }
}

/// Reads a `name: number` mapping, with keys parsed as `K`.
fn number_map<K>(yaml_cfg: &Yaml, what: &str) -> Result<Vec<(K, f64)>>
where
    K: FromStr,
{
    if yaml_cfg.is_badvalue() || yaml_cfg.is_null() {
        return Ok(vec![]);
    }
    let hash = yaml_cfg.as_hash()
        .ok_or_else(|| config_error(format!("{} must be a mapping", what)))?;
    let mut entries = vec![];
    for (key, value) in hash {
        let name = yaml_key(key)
            .ok_or_else(|| config_error(format!("bad key {:?} in {}", key, what)))?;
        let parsed = name.parse::<K>()
            .map_err(|_| config_error(format!("unrecognized key '{}' in {}", name, what)))?;
        let number = yaml_number(value)
            .ok_or_else(|| config_error(format!("{}.{} must be a number", what, name)))?;
        entries.push((parsed, number));
    }
    Ok(entries)
}

fn parse_cost_params(costs: &Yaml) -> Result<CostParameters> {
    let mut base_costs = HashMap::new();
    for phase in PhaseOfMatter::ALL.iter() {
        let what = format!("costs.base.{}", phase);
        for (mode, cost) in number_map::<Mode>(&costs["base"][phase.as_str()], &what)? {
            base_costs.insert((*phase, mode), cost);
        }
    }
    let transload_costs = number_map::<PhaseOfMatter>(&costs["transload"], "costs.transload")?
        .into_iter().collect();

    let mut params = CostParameters::new(base_costs, transload_costs);
    params.truck_local_rates = number_map(&costs["truck_local_rate"], "costs.truck_local_rate")?
        .into_iter().collect();
    for (mode, factor) in number_map::<Mode>(&costs["short_haul_penalty"], "costs.short_haul_penalty")? {
        params.short_haul_factors.insert(mode, factor);
    }
    if let Some(penalty) = optional_number(costs, "pipeline_access_penalty")? {
        params.pipeline_access_penalty = penalty;
    }
    Ok(params)
}

fn parse_impedance(impedance: &Yaml, costs: &Yaml) -> Result<ImpedanceTables> {
    let mut tables = ImpedanceTables::default();
    let road: Vec<(u8, f64)> = number_map(&impedance["road_functional_class"],
                                          "impedance.road_functional_class")?;
    if !road.is_empty() {
        tables.road_functional_class = road.into_iter().collect::<BTreeMap<u8, f64>>();
    }
    let rail: Vec<(u8, f64)> = number_map(&impedance["rail_density_code"],
                                          "impedance.rail_density_code")?;
    if !rail.is_empty() {
        tables.rail_density_code = rail.into_iter().collect();
    }

    let tiers = &impedance["water_volume_tiers"];
    if !tiers.is_badvalue() && !tiers.is_null() {
        let tier_list = tiers.as_vec()
            .ok_or_else(|| config_error(String::from("impedance.water_volume_tiers must be a list")))?;
        let mut water_volume_tiers = vec![];
        for tier in tier_list {
            let pair = tier.as_vec().map(|vv| vv.iter().filter_map(yaml_number).collect::<Vec<f64>>());
            match pair {
                Some(ref numbers) if numbers.len() == 2 => {
                    water_volume_tiers.push((numbers[0], numbers[1]));
                }
                _ => return Err(config_error(String::from(
                    "each water volume tier must be [minimum volume, impedance]"))),
            }
        }
        // highest threshold first
        water_volume_tiers.sort_by(|aa, bb| bb.0.partial_cmp(&aa.0).unwrap_or(std::cmp::Ordering::Equal));
        tables.water_volume_tiers = water_volume_tiers;
    }

    if let Some(local_impedance) = optional_number(costs, "local_impedance")? {
        tables.local_impedance = local_impedance;
    }
    Ok(tables)
}

impl ScenarioConfig {
    pub fn from_file(config_path: &Path) -> Result<ScenarioConfig> {
        let file_contents = fs::read_to_string(config_path)?;
        let base_dir = match config_path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        ScenarioConfig::from_yaml_str(&file_contents, &base_dir)
    }

    /// Relative paths in the yaml are taken relative to `base_dir`.
    pub fn from_yaml_str(yaml_str: &str, base_dir: &Path) -> Result<ScenarioConfig> {
        let yaml_cfgs = YamlLoader::load_from_str(yaml_str)
            .map_err(|err| config_error(format!("failed to parse config as yaml: {}", err)))?;
        let yaml_cfg = match yaml_cfgs.first() {
            Some(yaml_cfg) => yaml_cfg,
            None => return Err(config_error(String::from("config file is empty"))),
        };

        let nodes_path = yaml_cfg["network"]["nodes_path"].as_str()
            .map(|path| str_to_absolute_path(path, base_dir));
        let output_dir = match yaml_cfg["output_dir"].as_str() {
            Some(path) => str_to_absolute_path(path, base_dir),
            None => base_dir.join("output"),
        };
        let num_workers = match optional_number(yaml_cfg, "num_workers")? {
            Some(nn) if nn >= 1.0 && nn.fract() == 0.0 => Some(nn as usize),
            Some(nn) => return Err(config_error(
                format!("num_workers must be a positive integer, got {}", nn))),
            None => None,
        };

        let costs = &yaml_cfg["costs"];
        Ok(ScenarioConfig {
            edges_path: required_path(yaml_cfg, "network", "edges_path", base_dir)?,
            nodes_path,
            commodities_path: required_path(yaml_cfg, "catalog", "commodities_path", base_dir)?,
            facilities_path: required_path(yaml_cfg, "catalog", "facilities_path", base_dir)?,
            output_dir,
            ndr_enabled: optional_bool(yaml_cfg, "ndr_enabled", true)?,
            capacity_enforced: optional_bool(yaml_cfg, "capacity_enforced", false)?,
            candidate_generation_active: optional_bool(yaml_cfg, "candidate_generation_active",
                                                       false)?,
            num_workers,
            cost_params: parse_cost_params(costs)?,
            impedance: parse_impedance(&yaml_cfg["impedance"], costs)?,
        })
    }
}

impl PresolveConfig for ScenarioConfig {
    fn get_ndr_requested(&self) -> bool {
        self.ndr_enabled
    }

    fn get_capacity_enforced(&self) -> bool {
        self.capacity_enforced
    }

    fn get_candidate_generation_active(&self) -> bool {
        self.candidate_generation_active
    }

    fn get_num_workers(&self) -> Option<usize> {
        self.num_workers
    }
}
