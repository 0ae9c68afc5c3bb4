use std::collections::HashMap;
use serde_derive::{Deserialize, Serialize};
use crate::interop::base::Role;

type IniMap = HashMap<String, HashMap<String, Option<String>>>;

/// Configuration for one side of a paired interface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SideConfig {
    pub name: String,
    pub master: bool,      //pair master (fluid tie-break) / primary side (electrical)
    pub capacitance: f64,  //initial fluid capacitance (mol/Pa)
    pub pressure: f64,     //initial fluid pressure (Pa)
    pub temperature: f64,  //initial fluid temperature (K)
    pub voltage: f32,      //electrical regulated setpoint (V)
    pub load: f32,         //electrical nominal power demand (W)
    pub forced_role: Role, //operator override, Role::None for normal arbitration
}

impl Default for SideConfig {
    fn default() -> Self {
        SideConfig {
            name: "".to_string(),
            master: false,
            capacitance: 1.0,
            pressure: 101325.0,
            temperature: 294.261,
            voltage: 120.0,
            load: 100.0,
            forced_role: Role::None,
        }
    }
}

/// Configuration of a complete paired run: interface kind, transport lag,
/// run length, mixture sizing, and the two sides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairConfig {
    pub kind: String, //"elect" or "fluid"
    pub lag_frames: usize,
    pub steps: usize,
    pub timestep: f64, //s
    pub n_bulk: usize,
    pub n_tc: usize,
    pub side_a: SideConfig,
    pub side_b: SideConfig,
}

impl Default for PairConfig {
    fn default() -> Self {
        PairConfig {
            kind: "fluid".to_string(),
            lag_frames: 2,
            steps: 200,
            timestep: 0.1,
            n_bulk: 4,
            n_tc: 2,
            side_a: SideConfig {
                name: "side_a".to_string(),
                master: true,
                ..Default::default()
            },
            side_b: SideConfig {
                name: "side_b".to_string(),
                ..Default::default()
            },
        }
    }
}

/*
Reads a pair configuration from an INI file.
 */
pub fn read_pair_config(path: &str) -> Result<PairConfig, String> {
    let map = ini!(safe path)?;
    config_from_map(&map)
}

/*
Parses a pair configuration from an INI-formatted string.
 */
pub fn parse_pair_config(content: &str) -> Result<PairConfig, String> {
    let map = inistr!(safe content)?;
    config_from_map(&map)
}

fn config_from_map(map: &IniMap) -> Result<PairConfig, String> {
    if !map.contains_key("interface") {
        return Err("Pair config is missing the [interface] section.".to_string());
    }

    let mut config = PairConfig::default();
    config.kind = get_string(map, "interface", "kind", &config.kind);
    if config.kind != "elect" && config.kind != "fluid" {
        return Err(format!(
            "Unknown interface kind '{}'. Expected 'elect' or 'fluid'.",
            config.kind
        ));
    }
    config.lag_frames = get_parsed(map, "interface", "lag_frames", config.lag_frames)?;
    config.steps = get_parsed(map, "interface", "steps", config.steps)?;
    config.timestep = get_parsed(map, "interface", "timestep", config.timestep)?;
    config.n_bulk = get_parsed(map, "interface", "n_bulk", config.n_bulk)?;
    config.n_tc = get_parsed(map, "interface", "n_tc", config.n_tc)?;

    config.side_a = side_from_map(map, "side_a", config.side_a)?;
    config.side_b = side_from_map(map, "side_b", config.side_b)?;

    if config.side_a.master == config.side_b.master {
        return Err("Exactly one side must set master = true.".to_string());
    }

    Ok(config)
}

fn side_from_map(map: &IniMap, section: &str, defaults: SideConfig) -> Result<SideConfig, String> {
    let mut side = defaults;
    side.name = get_string(map, section, "name", section);
    side.master = get_parsed(map, section, "master", side.master)?;
    side.capacitance = get_parsed(map, section, "capacitance", side.capacitance)?;
    side.pressure = get_parsed(map, section, "pressure", side.pressure)?;
    side.temperature = get_parsed(map, section, "temperature", side.temperature)?;
    side.voltage = get_parsed(map, section, "voltage", side.voltage)?;
    side.load = get_parsed(map, section, "load", side.load)?;

    side.forced_role = match get_string(map, section, "forced_role", "none").as_str() {
        "none" => Role::None,
        "supply" => Role::Supply,
        "demand" => Role::Demand,
        other => {
            return Err(format!(
                "Unknown forced_role '{}' in [{}]. Expected none, supply or demand.",
                other, section
            ));
        }
    };

    Ok(side)
}

/*
Looks a key up, falling back to the given default when the section or key
is absent. Note the ini parser lowercases section and key names.
 */
fn get_string(map: &IniMap, section: &str, key: &str, default: &str) -> String {
    match map.get(section).and_then(|s| s.get(key)) {
        Some(Some(value)) => value.clone(),
        _ => default.to_string(),
    }
}

fn get_parsed<T: std::str::FromStr>(
    map: &IniMap,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, String> {
    match map.get(section).and_then(|s| s.get(key)) {
        Some(Some(value)) => value
            .parse::<T>()
            .map_err(|_| format!("Could not parse [{}] {} = '{}'.", section, key, value)),
        _ => Ok(default),
    }
}
