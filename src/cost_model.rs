use std::collections::{BTreeMap, HashMap};

use super::error::{PresolveError, Result};
use super::network::{LinkClass, Mode, NetworkEdge, PhaseOfMatter};


pub const DEFAULT_LOCAL_IMPEDANCE: f64 = 1.3;
pub const DEFAULT_SHORT_HAUL_FACTOR: f64 = 0.5;
pub const DEFAULT_PIPELINE_ACCESS_PENALTY: f64 = 0.19;

/// Priced inputs of the cost model, keyed by enum values.
#[derive(Clone, Debug)]
pub struct CostParameters {
    /// per-mile cost of moving one unit on network and access links
    pub base_costs: HashMap<(PhaseOfMatter, Mode), f64>,
    /// cost of one transload; each transfer edge carries half of it
    pub transload_costs: HashMap<PhaseOfMatter, f64>,
    /// falls back to the road base cost of the phase when not given
    pub truck_local_rates: HashMap<PhaseOfMatter, f64>,
    pub short_haul_factors: HashMap<Mode, f64>,
    pub pipeline_access_penalty: f64,
}

impl CostParameters {
    pub fn new(base_costs: HashMap<(PhaseOfMatter, Mode), f64>,
               transload_costs: HashMap<PhaseOfMatter, f64>) -> CostParameters {
        let short_haul_factors = [
            (Mode::Rail, DEFAULT_SHORT_HAUL_FACTOR),
            (Mode::Water, DEFAULT_SHORT_HAUL_FACTOR),
        ].iter().cloned().collect();
        CostParameters {
            base_costs,
            transload_costs,
            truck_local_rates: HashMap::new(),
            short_haul_factors,
            pipeline_access_penalty: DEFAULT_PIPELINE_ACCESS_PENALTY,
        }
    }
}

/// Impedance multipliers folded into each edge's route cost scaling.
#[derive(Clone, Debug)]
pub struct ImpedanceTables {
    pub road_functional_class: BTreeMap<u8, f64>,
    pub rail_density_code: BTreeMap<u8, f64>,
    /// (minimum annual volume, impedance), highest threshold first
    pub water_volume_tiers: Vec<(f64, f64)>,
    /// impedance of local roads, used on road access links and in short-haul penalties
    pub local_impedance: f64,
}

impl Default for ImpedanceTables {
    fn default() -> ImpedanceTables {
        let road_functional_class = [
            (1, 1.0), (2, 1.0), (3, 1.2), (4, 1.3), (5, 1.4), (6, 1.5), (7, 1.6),
        ].iter().cloned().collect();
        let rail_density_code = [
            (7, 1.0), (6, 1.1), (5, 1.2), (4, 1.3), (3, 1.5), (2, 1.7), (1, 2.0), (0, 10.0),
        ].iter().cloned().collect();
        ImpedanceTables {
            road_functional_class,
            rail_density_code,
            water_volume_tiers: vec![
                (10_000_000.0, 1.0),
                (5_000_000.0, 1.2),
                (1_000_000.0, 1.5),
                (100_000.0, 2.0),
                (0.0, 3.0),
            ],
            local_impedance: DEFAULT_LOCAL_IMPEDANCE,
        }
    }
}

impl ImpedanceTables {
    /// Multiplier applied on top of the per-mile base cost.  Pipelines return `None`:
    /// their scaling is the tariff, which has to come with the network.
    pub fn route_cost_scaling(&self, edge: &NetworkEdge) -> Option<f64> {
        if edge.link_class == LinkClass::Transfer {
            return Some(1.0);
        }
        if edge.mode.is_pipeline() {
            return None;
        }
        let scaling = match (&edge.mode, edge.link_class) {
            (Mode::Road, LinkClass::Network) => edge.attributes.functional_class
                .and_then(|fc| self.road_functional_class.get(&fc).copied())
                .unwrap_or(1.0),
            (Mode::Road, _) => self.local_impedance,
            (Mode::Rail, LinkClass::Network) => edge.attributes.density_code
                .and_then(|dc| self.rail_density_code.get(&dc).copied())
                .unwrap_or(1.0),
            (Mode::Water, LinkClass::Network) => match edge.attributes.traffic_volume {
                Some(volume) => self.water_volume_tiers.iter()
                    .find(|(threshold, _)| volume >= *threshold)
                    .map(|(_, impedance)| *impedance)
                    .unwrap_or(1.0),
                None => 1.0,
            },
            _ => 1.0,
        };
        Some(scaling)
    }
}

/// Maps (phase of matter, mode, link class) to base costs and short-haul penalties.
#[derive(Clone, Debug)]
pub struct CostModel {
    params: CostParameters,
    impedance: ImpedanceTables,
}

impl CostModel {
    /// Fails if the cost table doesn't cover road, rail and water for both phases of
    /// matter, a transload cost is missing, or any priced input is negative.
    pub fn new(params: CostParameters, impedance: ImpedanceTables) -> Result<CostModel> {
        for phase in PhaseOfMatter::ALL.iter() {
            for mode in [Mode::Road, Mode::Rail, Mode::Water].iter() {
                match params.base_costs.get(&(*phase, mode.clone())) {
                    Some(cost) => check_non_negative(*cost, &format!("{} {} base cost", phase, mode))?,
                    None => return Err(PresolveError::Configuration(
                        format!("cost table has no {} cost for {}", mode, phase))),
                }
            }
            match params.transload_costs.get(phase) {
                Some(cost) => check_non_negative(*cost, &format!("{} transload cost", phase))?,
                None => return Err(PresolveError::Configuration(
                    format!("cost table has no transload cost for {}", phase))),
            }
        }
        for mode in [Mode::Rail, Mode::Water].iter() {
            if !params.short_haul_factors.contains_key(mode) {
                return Err(PresolveError::Configuration(
                    format!("no short haul penalty factor for {}", mode)));
            }
        }
        check_non_negative(params.pipeline_access_penalty, "pipeline access penalty")?;
        check_non_negative(impedance.local_impedance, "local impedance")?;
        Ok(CostModel { params, impedance })
    }

    pub fn impedance(&self) -> &ImpedanceTables {
        &self.impedance
    }

    pub fn cost(&self, phase: PhaseOfMatter, mode: &Mode, link_class: LinkClass) -> Result<f64> {
        let cost = match link_class {
            LinkClass::Network | LinkClass::Access => {
                if let Mode::Other(_) = mode {
                    None
                } else {
                    self.params.base_costs.get(&(phase, mode.clone())).copied()
                }
            }
            LinkClass::Transfer => match mode {
                Mode::Other(_) => None,
                _ => self.params.transload_costs.get(&phase).copied(),
            },
        };
        cost.ok_or_else(|| PresolveError::Configuration(format!(
            "no cost for {} on {} links of class {}", phase, mode, link_class.code())))
    }

    pub fn truck_local_rate(&self, phase: PhaseOfMatter) -> Result<f64> {
        match self.params.truck_local_rates.get(&phase) {
            Some(rate) => Ok(*rate),
            None => self.cost(phase, &Mode::Road, LinkClass::Network),
        }
    }

    pub fn pipeline_access_penalty(&self) -> f64 {
        self.params.pipeline_access_penalty
    }

    /// The full short-haul penalty of a mode.  Access links are paired at both ends of
    /// a movement, so each one carries half of it.
    pub fn short_haul_penalty(&self, phase: PhaseOfMatter, mode: &Mode) -> Result<f64> {
        match mode {
            Mode::Road => Ok(0.0),
            Mode::Rail | Mode::Water => {
                let factor = match self.params.short_haul_factors.get(mode) {
                    Some(factor) => *factor,
                    None => return Err(PresolveError::Configuration(
                        format!("no short haul penalty factor for {}", mode))),
                };
                let local_truck = self.truck_local_rate(phase)? * self.impedance.local_impedance;
                let mode_cost = self.cost(phase, mode, LinkClass::Network)?;
                Ok((local_truck - mode_cost) * factor)
            }
            Mode::PipelineCrude | Mode::PipelineProduct => Ok(self.params.pipeline_access_penalty),
            Mode::Other(name) => Err(PresolveError::Configuration(
                format!("no short haul penalty for mode {}", name))),
        }
    }
}

fn check_non_negative(value: f64, what: &str) -> Result<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(PresolveError::Configuration(format!("{} must be non-negative, got {}", what, value)))
    }
}
