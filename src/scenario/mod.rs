use std::collections::HashMap;
use std::path::Path;

use lander_config::{
    BodyConfig, ConfigError, SimulationSettings, ThresholdsConfig, VehicleConfig, load_bodies,
    load_settings, load_vehicle_configs,
};
use lander_orbits::{BodyDefinition, OrbitError, OrbitalSystem};
use lander_propulsion::{Kinematics, VehicleSpec, VehicleState};
use lander_touchdown::{ThresholdError, Thresholds};
use thiserror::Error;

use crate::simulation::{Dynamics, PointGravityDynamics, Simulation, StepSettings};

/// Everything needed to start a run, built from configuration.
#[derive(Debug)]
pub struct Scenario {
    pub system: OrbitalSystem,
    pub vehicles: Vec<VehicleState>,
    pub settings: SimulationSettings,
    pub step: StepSettings,
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid body system: {0}")]
    Orbit(#[from] OrbitError),
    #[error("invalid thresholds for `{scope}`: {source}")]
    Thresholds {
        scope: String,
        #[source]
        source: ThresholdError,
    },
    #[error("scenario defines no vehicles")]
    NoVehicles,
}

/// Load bodies, vehicles, and optional settings from disk.
pub fn load_scenario<P, Q>(
    bodies: P,
    vehicles: Q,
    settings: Option<&Path>,
) -> Result<Scenario, ScenarioError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let bodies = load_bodies(bodies)?;
    let vehicles = load_vehicle_configs(vehicles)?;
    let settings = match settings {
        Some(path) => load_settings(path)?,
        None => SimulationSettings::default(),
    };
    build_scenario(&bodies, &vehicles, settings)
}

/// Assemble a scenario from already-parsed configuration records.
pub fn build_scenario(
    bodies: &[BodyConfig],
    vehicles: &[VehicleConfig],
    settings: SimulationSettings,
) -> Result<Scenario, ScenarioError> {
    if vehicles.is_empty() {
        return Err(ScenarioError::NoVehicles);
    }

    let thresholds = thresholds_from_config(&settings.thresholds, "defaults")?;
    let mut body_thresholds = HashMap::new();
    for body in bodies {
        if let Some(config) = &body.thresholds {
            body_thresholds.insert(body.name.clone(), thresholds_from_config(config, &body.name)?);
        }
    }

    let system = OrbitalSystem::new(bodies.iter().map(body_definition).collect())?;
    let vehicles = vehicles.iter().map(vehicle_state).collect();
    let step = StepSettings {
        fuel_burn_rate: settings.fuel_burn_rate,
        thresholds,
        body_thresholds,
    };

    Ok(Scenario {
        system,
        vehicles,
        settings,
        step,
    })
}

impl Scenario {
    /// Start a simulation driven by the reference point-gravity collaborator.
    pub fn into_simulation(self) -> Simulation<PointGravityDynamics> {
        let dynamics = PointGravityDynamics::new(self.settings.gravitational_constant);
        self.into_simulation_with(dynamics)
    }

    /// Start a simulation with a caller-supplied dynamics collaborator.
    pub fn into_simulation_with<D: Dynamics>(self, dynamics: D) -> Simulation<D> {
        Simulation::new(self.system, self.vehicles, self.step, dynamics)
    }
}

/// Convert and validate configured thresholds.
pub fn thresholds_from_config(
    config: &ThresholdsConfig,
    scope: &str,
) -> Result<Thresholds, ScenarioError> {
    let thresholds = Thresholds::new(
        config.landing_max_speed,
        config.landing_max_angle_deg,
        config.landing_max_angular_velocity,
        config.crash_speed,
        config.crash_angle_deg,
        config.crash_angular_velocity,
    );
    thresholds
        .validate()
        .map_err(|source| ScenarioError::Thresholds {
            scope: scope.to_string(),
            source,
        })?;
    Ok(thresholds)
}

fn body_definition(config: &BodyConfig) -> BodyDefinition {
    BodyDefinition {
        name: config.name.clone(),
        mass: config.mass,
        radius: config.radius,
        color: config.color,
        parent: config.parent.clone(),
        orbit_distance: config.orbit_distance,
        orbit_speed: config.orbit_speed,
        initial_phase: config.initial_phase,
        position: config.position,
        fixed_surface_frame: config.fixed_surface_frame,
    }
}

fn vehicle_state(config: &VehicleConfig) -> VehicleState {
    let thrusters = &config.thrusters;
    VehicleState::new(VehicleSpec {
        name: config.name.clone(),
        mass: config.mass,
        width: config.width,
        height: config.height,
        fuel_capacity: config.fuel_capacity,
        initial_fuel: config.fuel.unwrap_or(config.fuel_capacity),
        max_health: config.max_health,
        max_power: [thrusters.main, thrusters.top, thrusters.left, thrusters.right],
        spawn: Kinematics {
            position: config.spawn.position,
            velocity: config.spawn.velocity,
            angle: config.spawn.angle,
            angular_velocity: config.spawn.angular_velocity,
        },
    })
}
