use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::{PresolveError, Result};
use super::io_utils;
use super::network::{Mode, PhaseOfMatter};


/// Whether a facility consumes or produces a commodity.  Also used as the in/out
/// marker of facility location nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Io {
    Input,
    Output,
}

impl FromStr for Io {
    type Err = PresolveError;

    fn from_str(ss: &str) -> Result<Io> {
        match ss.trim().to_lowercase().as_str() {
            "i" | "in" | "input" => Ok(Io::Input),
            "o" | "out" | "output" => Ok(Io::Output),
            other => Err(PresolveError::Configuration(format!("unknown io marker '{}'", other))),
        }
    }
}

impl fmt::Display for Io {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Io::Input => write!(f, "i"),
            Io::Output => write!(f, "o"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FacilityRole {
    RawMaterialProducer,
    Processor,
    UltimateDestination,
}

impl FacilityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityRole::RawMaterialProducer => "raw_material_producer",
            FacilityRole::Processor => "processor",
            FacilityRole::UltimateDestination => "ultimate_destination",
        }
    }
}

impl FromStr for FacilityRole {
    type Err = PresolveError;

    fn from_str(ss: &str) -> Result<FacilityRole> {
        match ss.trim().to_lowercase().as_str() {
            "raw_material_producer" | "rmp" => Ok(FacilityRole::RawMaterialProducer),
            "processor" => Ok(FacilityRole::Processor),
            "ultimate_destination" | "dest" => Ok(FacilityRole::UltimateDestination),
            other => Err(PresolveError::Configuration(format!("unknown facility type '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Commodity {
    pub commodity_id: String,
    pub commodity_name: String,
    pub phase_of_matter: PhaseOfMatter,
    // None when no mode restriction was supplied
    pub allowed_modes: Option<BTreeSet<Mode>>,
    pub max_transport_distance: Option<f64>,
}

impl Commodity {
    pub fn new(commodity_id: &str, phase_of_matter: PhaseOfMatter) -> Commodity {
        Commodity {
            commodity_id: String::from(commodity_id),
            commodity_name: String::from(commodity_id),
            phase_of_matter,
            allowed_modes: None,
            max_transport_distance: None,
        }
    }

    pub fn with_allowed_modes(mut self, modes: &[Mode]) -> Commodity {
        self.allowed_modes = Some(modes.iter().cloned().collect());
        self
    }

    pub fn with_max_transport_distance(mut self, mtd: f64) -> Commodity {
        self.max_transport_distance = Some(mtd);
        self
    }

    pub fn allows_mode(&self, mode: &Mode) -> bool {
        match &self.allowed_modes {
            Some(modes) => modes.contains(mode),
            None => true,
        }
    }

    /// Commodities with the same key share one subgraph.
    pub fn mode_key(&self) -> String {
        match &self.allowed_modes {
            Some(modes) => Mode::set_key(modes),
            None => String::from("*"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Facility {
    pub facility_id: String,
    pub facility_name: String,
    pub location_id: Option<String>,
    pub role: FacilityRole,
    pub node_id: i64,
    pub commodities: Vec<(String, Io)>,
}

impl Facility {
    pub fn new(facility_id: &str, role: FacilityRole, node_id: i64) -> Facility {
        Facility {
            facility_id: String::from(facility_id),
            facility_name: String::from(facility_id),
            location_id: None,
            role,
            node_id,
            commodities: vec![],
        }
    }

    pub fn with_commodity(mut self, commodity_id: &str, io: Io) -> Facility {
        self.commodities.push((String::from(commodity_id), io));
        self
    }

    pub fn exposes(&self, commodity_id: &str, io: Io) -> bool {
        self.commodities.iter().any(|(cid, cio)| cid == commodity_id && *cio == io)
    }

    /// Can this facility be the origin of a shipment of the commodity?
    pub fn ships(&self, commodity_id: &str) -> bool {
        self.role != FacilityRole::UltimateDestination && self.exposes(commodity_id, Io::Output)
    }

    /// Can this facility be the destination of a shipment of the commodity?
    pub fn receives(&self, commodity_id: &str) -> bool {
        self.role != FacilityRole::RawMaterialProducer && self.exposes(commodity_id, Io::Input)
    }
}

/// The facility and commodity catalog of a scenario.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub commodities: Vec<Commodity>,
    pub facilities: Vec<Facility>,
}

impl Catalog {
    pub fn new(commodities: Vec<Commodity>, facilities: Vec<Facility>) -> Catalog {
        Catalog { commodities, facilities }
    }

    pub fn from_csv(commodities_path: &Path, facilities_path: &Path) -> Result<Catalog> {
        let file = io_utils::file_label(commodities_path);
        let mut commodities: Vec<Commodity> = vec![];
        for row in io_utils::read_rows(commodities_path)? {
            let commodity_id: String = io_utils::parse_required(&row, "commodity_id", &file)?;
            if commodities.iter().any(|cc| cc.commodity_id == commodity_id) {
                return Err(PresolveError::input(&file,
                    format!("duplicate commodity {}", commodity_id)));
            }
            let commodity_name = match io_utils::get_row_value(&row, "commodity_name") {
                Some(name) => String::from(name),
                None => commodity_id.clone(),
            };
            let allowed_modes = io_utils::get_row_value(&row, "allowed_modes")
                .map(Mode::parse_list)
                .filter(|modes| !modes.is_empty());
            commodities.push(Commodity {
                commodity_id,
                commodity_name,
                phase_of_matter: io_utils::parse_required(&row, "phase_of_matter", &file)?,
                allowed_modes,
                max_transport_distance: io_utils::parse_optional(&row, "max_transport_distance",
                                                                 &file)?,
            });
        }

        let file = io_utils::file_label(facilities_path);
        let mut facilities: Vec<Facility> = vec![];
        let mut facility_idxs: HashMap<String, usize> = HashMap::new();
        for row in io_utils::read_rows(facilities_path)? {
            let facility_id: String = io_utils::parse_required(&row, "facility_id", &file)?;
            let role: FacilityRole = io_utils::parse_required(&row, "facility_type", &file)?;
            let node_id: i64 = io_utils::parse_required(&row, "node_id", &file)?;
            let commodity_id: String = io_utils::parse_required(&row, "commodity_id", &file)?;
            let io: Io = io_utils::parse_required(&row, "io", &file)?;
            if !commodities.iter().any(|cc| cc.commodity_id == commodity_id) {
                return Err(PresolveError::input(&file, format!(
                    "facility {} references unknown commodity {}", facility_id, commodity_id)));
            }

            let idx = match facility_idxs.get(&facility_id).copied() {
                Some(idx) => idx,
                None => {
                    let mut facility = Facility::new(&facility_id, role, node_id);
                    if let Some(name) = io_utils::get_row_value(&row, "facility_name") {
                        facility.facility_name = String::from(name);
                    }
                    facility.location_id = io_utils::get_row_value(&row, "location_id")
                        .map(String::from);
                    facilities.push(facility);
                    facility_idxs.insert(facility_id.clone(), facilities.len() - 1);
                    facilities.len() - 1
                }
            };
            let facility = &mut facilities[idx];
            if facility.role != role || facility.node_id != node_id {
                return Err(PresolveError::input(&file, format!(
                    "facility {} has conflicting type or node", facility_id)));
            }
            facility.commodities.push((commodity_id, io));
        }

        log::info!("Loaded {} commodities and {} facilities", commodities.len(), facilities.len());
        Ok(Catalog { commodities, facilities })
    }

    pub fn get_commodity(&self, commodity_id: &str) -> Option<&Commodity> {
        self.commodities.iter().find(|cc| cc.commodity_id == commodity_id)
    }

    pub fn phases(&self) -> BTreeSet<PhaseOfMatter> {
        self.commodities.iter().map(|cc| cc.phase_of_matter).collect()
    }

    pub fn has_mode_restrictions(&self) -> bool {
        self.commodities.iter().any(|cc| cc.allowed_modes.is_some())
    }

    pub fn has_mtd_commodities(&self) -> bool {
        self.commodities.iter().any(|cc| cc.max_transport_distance.is_some())
    }

    pub fn origin_facilities<'a>(&'a self, commodity_id: &'a str)
                                 -> impl Iterator<Item = &'a Facility> + 'a {
        self.facilities.iter().filter(move |ff| ff.ships(commodity_id))
    }

    pub fn destination_facilities<'a>(&'a self, commodity_id: &'a str)
                                      -> impl Iterator<Item = &'a Facility> + 'a {
        self.facilities.iter().filter(move |ff| ff.receives(commodity_id))
    }
}
