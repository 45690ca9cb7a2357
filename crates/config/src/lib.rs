//! Configuration models and loaders for the lander simulator.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Celestial body parsed from scenario catalogs.
#[derive(Debug, Deserialize, Clone)]
pub struct BodyConfig {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub orbit_distance: f64,
    #[serde(default)]
    pub orbit_speed: f64,
    #[serde(default)]
    pub initial_phase: f64,
    /// Fixed position of a root body; ignored when `parent` is set.
    #[serde(default)]
    pub position: [f64; 2],
    /// Surface frame never advances; attached vehicles keep their captured pose.
    #[serde(default)]
    pub fixed_surface_frame: bool,
    /// Per-body touchdown limits (e.g. a harsher atmosphere).
    #[serde(default)]
    pub thresholds: Option<ThresholdsConfig>,
}

/// Touchdown classification limits.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ThresholdsConfig {
    pub landing_max_speed: f64,
    pub landing_max_angle_deg: f64,
    pub landing_max_angular_velocity: f64,
    #[serde(default)]
    pub crash_speed: Option<f64>,
    pub crash_angle_deg: f64,
    pub crash_angular_velocity: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            landing_max_speed: 2_500.0,
            landing_max_angle_deg: 30.0,
            landing_max_angular_velocity: 400.0,
            crash_speed: None,
            crash_angle_deg: 45.0,
            crash_angular_velocity: 400.0,
        }
    }
}

/// Vehicle parsed from scenario catalogs.
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    pub name: String,
    pub mass: f64,
    pub width: f64,
    pub height: f64,
    pub fuel_capacity: f64,
    /// Starting fuel; defaults to a full tank.
    #[serde(default)]
    pub fuel: Option<f64>,
    pub max_health: f64,
    pub thrusters: ThrusterConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
}

/// Maximum power of each named thruster.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ThrusterConfig {
    pub main: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub right: f64,
}

/// Initial free-flight kinematics of a vehicle.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct SpawnConfig {
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub velocity: [f64; 2],
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub angular_velocity: f64,
}

/// Global simulation settings loaded from a single TOML file.
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationSettings {
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    #[serde(default = "default_gravitational_constant")]
    pub gravitational_constant: f64,
    /// Fuel consumed per unit of thruster power per second.
    #[serde(default = "default_fuel_burn_rate")]
    pub fuel_burn_rate: f64,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            time_step: default_time_step(),
            gravitational_constant: default_gravitational_constant(),
            fuel_burn_rate: default_fuel_burn_rate(),
            thresholds: ThresholdsConfig::default(),
        }
    }
}

fn default_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_time_step() -> f64 {
    1.0 / 60.0
}

fn default_gravitational_constant() -> f64 {
    1.0
}

fn default_fuel_burn_rate() -> f64 {
    0.01
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for `{field}` in `{record}`: {reason}")]
    Invalid {
        record: String,
        field: &'static str,
        reason: &'static str,
    },
}

/// Load body configurations from a YAML list, a TOML file, or a directory of TOML files.
pub fn load_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<BodyConfig>, ConfigError> {
    let bodies: Vec<BodyConfig> = load_records(path)?;
    for body in &bodies {
        validate_body(body)?;
    }
    Ok(bodies)
}

/// Load vehicle configurations from a YAML list, a TOML file, or a directory of TOML files.
pub fn load_vehicle_configs<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleConfig>, ConfigError> {
    let vehicles: Vec<VehicleConfig> = load_records(path)?;
    for vehicle in &vehicles {
        validate_vehicle(vehicle)?;
    }
    Ok(vehicles)
}

/// Load the simulation settings file (TOML).
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<SimulationSettings, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let settings: SimulationSettings = toml::from_str(&contents)?;
    if settings.time_step <= 0.0 {
        return Err(invalid("settings", "time_step", "must be positive"));
    }
    if settings.fuel_burn_rate < 0.0 {
        return Err(invalid("settings", "fuel_burn_rate", "must not be negative"));
    }
    Ok(settings)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

fn validate_body(body: &BodyConfig) -> Result<(), ConfigError> {
    if body.mass <= 0.0 {
        return Err(invalid(&body.name, "mass", "must be positive"));
    }
    if body.radius <= 0.0 {
        return Err(invalid(&body.name, "radius", "must be positive"));
    }
    if body.orbit_distance < 0.0 {
        return Err(invalid(&body.name, "orbit_distance", "must not be negative"));
    }
    Ok(())
}

fn validate_vehicle(vehicle: &VehicleConfig) -> Result<(), ConfigError> {
    if vehicle.mass <= 0.0 {
        return Err(invalid(&vehicle.name, "mass", "must be positive"));
    }
    if vehicle.max_health <= 0.0 {
        return Err(invalid(&vehicle.name, "max_health", "must be positive"));
    }
    if vehicle.fuel_capacity < 0.0 {
        return Err(invalid(&vehicle.name, "fuel_capacity", "must not be negative"));
    }
    let thrusters = &vehicle.thrusters;
    if [thrusters.main, thrusters.top, thrusters.left, thrusters.right]
        .iter()
        .any(|power| *power < 0.0)
    {
        return Err(invalid(&vehicle.name, "thrusters", "must not be negative"));
    }
    Ok(())
}

fn invalid(record: &str, field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        record: record.to_string(),
        field,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn directory_of_toml_bodies_loads_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "b_moon.toml",
            r#"
name = "Moon"
mass = 10.0
radius = 5.0
parent = "Sun"
orbit_distance = 1000.0
orbit_speed = 0.01
"#,
        );
        write(
            dir.path(),
            "a_sun.toml",
            r#"
name = "Sun"
mass = 1000.0
radius = 50.0
fixed_surface_frame = true
"#,
        );
        write(dir.path(), "notes.txt", "ignored");

        let bodies = load_bodies(dir.path()).expect("bodies");
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].name, "Sun");
        assert!(bodies[0].fixed_surface_frame);
        assert_eq!(bodies[1].parent.as_deref(), Some("Sun"));
        assert_eq!(bodies[1].color, [255, 255, 255]);
    }

    #[test]
    fn yaml_vehicle_list_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "vehicles.yaml",
            r#"
- name: Hopper
  mass: 10.0
  width: 2.0
  height: 4.0
  fuel_capacity: 100.0
  max_health: 100.0
  thrusters: { main: 50.0, left: 5.0, right: 5.0 }
  spawn: { position: [0.0, 120.0], angle: 1.5707963267948966 }
"#,
        );
        let vehicles = load_vehicle_configs(&path).expect("vehicles");
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].thrusters.top, 0.0);
        assert_eq!(vehicles[0].spawn.position, [0.0, 120.0]);
        assert!(vehicles[0].fuel.is_none());
    }

    #[test]
    fn negative_radius_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "broken.toml",
            "name = \"Broken\"\nmass = 1.0\nradius = -1.0\n",
        );
        match load_bodies(&path) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "radius"),
            other => panic!("expected invalid radius, got {other:?}"),
        }
    }

    #[test]
    fn settings_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "simulation.toml",
            "gravitational_constant = 2.0\n[thresholds]\nlanding_max_speed = 10.0\nlanding_max_angle_deg = 20.0\nlanding_max_angular_velocity = 1.0\ncrash_angle_deg = 40.0\ncrash_angular_velocity = 2.0\n",
        );
        let settings = load_settings(&path).expect("settings");
        assert_eq!(settings.gravitational_constant, 2.0);
        assert!((settings.time_step - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(settings.thresholds.landing_max_speed, 10.0);
        assert!(settings.thresholds.crash_speed.is_none());
    }
}
