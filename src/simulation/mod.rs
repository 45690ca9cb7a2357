//! Per-tick orchestration of bodies, attached vehicles, and free flight.
//!
//! Each tick runs in a fixed order:
//! 1. advance every body's orbital phase;
//! 2. re-project attached vehicles from their snapshots using the new phase;
//! 3. burn fuel for live vehicles and lift off landed vehicles under main thrust;
//! 4. hand free vehicles to the [`Dynamics`] collaborator;
//! 5. classify the contacts it reports and attach landed or wrecked vehicles.

pub mod dynamics;
pub mod notify;

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::mpsc::Sender;

use lander_attachment::{capture, resolve, surface_velocity};
use lander_core::constants::DISTANCE_EPSILON;
use lander_core::vector::{self, Vector2};
use lander_orbits::{BodyId, OrbitalSystem};
use lander_propulsion::{DamageOutcome, ThrusterName, VehicleState};
use lander_touchdown::{Outcome, Thresholds, classify};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use dynamics::{ContactEvent, Dynamics, FreeBody, PointGravityDynamics};
pub use notify::{Notification, Notifier, TransitionKind};

/// Index of a vehicle inside its [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VehicleId(pub usize);

/// Tunables for the orchestrator itself.
#[derive(Debug, Clone)]
pub struct StepSettings {
    /// Fuel consumed per unit of thruster power per second.
    pub fuel_burn_rate: f64,
    /// Limits used for bodies without their own override.
    pub thresholds: Thresholds,
    /// Per-body overrides keyed by body name.
    pub body_thresholds: HashMap<String, Thresholds>,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            fuel_burn_rate: 0.01,
            thresholds: Thresholds::default(),
            body_thresholds: HashMap::new(),
        }
    }
}

impl StepSettings {
    pub fn thresholds_for(&self, body: &str) -> &Thresholds {
        self.body_thresholds.get(body).unwrap_or(&self.thresholds)
    }
}

/// Read-only view of a body after a tick.
#[derive(Debug, Clone, Serialize)]
pub struct BodySnapshot {
    pub name: String,
    pub position: Vector2,
    pub velocity: Vector2,
    pub orbit_angle: f64,
    pub radius: f64,
    pub color: [u8; 3],
}

/// Read-only view of a vehicle after a tick.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub name: String,
    pub position: Vector2,
    pub velocity: Vector2,
    pub angle: f64,
    pub fuel: f64,
    pub health: f64,
    pub destroyed: bool,
    pub landed: bool,
    pub landed_on: Option<String>,
    pub attached_to: Option<String>,
}

/// Everything observers may read once a tick has completed.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub time: f64,
    pub bodies: Vec<BodySnapshot>,
    pub vehicles: Vec<VehicleSnapshot>,
}

/// Owns the bodies, vehicles, and collaborator for the duration of the run.
pub struct Simulation<D: Dynamics> {
    system: OrbitalSystem,
    vehicles: Vec<VehicleState>,
    settings: StepSettings,
    dynamics: D,
    notifier: Notifier,
    elapsed: f64,
}

impl<D: Dynamics> Simulation<D> {
    pub fn new(
        system: OrbitalSystem,
        vehicles: Vec<VehicleState>,
        settings: StepSettings,
        dynamics: D,
    ) -> Self {
        Self {
            system,
            vehicles,
            settings,
            dynamics,
            notifier: Notifier::default(),
            elapsed: 0.0,
        }
    }

    /// Deliver transition notifications to `sender`.
    pub fn with_notifications(mut self, sender: Sender<Notification>) -> Self {
        self.notifier.subscribe(sender);
        self
    }

    pub fn subscribe(&mut self, sender: Sender<Notification>) {
        self.notifier.subscribe(sender);
    }

    pub fn system(&self) -> &OrbitalSystem {
        &self.system
    }

    pub fn vehicles(&self) -> &[VehicleState] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleState> {
        self.vehicles.get(id.0)
    }

    pub fn find_vehicle(&self, name: &str) -> Option<VehicleId> {
        self.vehicles
            .iter()
            .position(|vehicle| vehicle.name() == name)
            .map(VehicleId)
    }

    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Run one tick of `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.system.advance(dt);
        self.elapsed += dt;
        self.track_attached();
        self.burn_fuel(dt);
        let contacts = self.fly_free(dt);
        for contact in contacts {
            self.handle_contact(contact);
        }
    }

    /// Request thruster power for a vehicle. Silently clamped by the vehicle.
    pub fn set_thruster_power(&mut self, id: VehicleId, name: ThrusterName, power: f64) {
        if let Some(vehicle) = self.vehicles.get_mut(id.0) {
            vehicle.set_thruster_power(name, power);
        }
    }

    /// Apply damage from an external source. A vehicle destroyed while attached to or
    /// touching a body is re-anchored there as debris.
    pub fn damage_vehicle(&mut self, id: VehicleId, amount: f64) -> Option<DamageOutcome> {
        let vehicle = self.vehicles.get_mut(id.0)?;
        let outcome = vehicle.apply_damage(amount);
        if outcome == DamageOutcome::Destroyed {
            let body = vehicle.attached_to().map(str::to_string);
            if let Some(name) = &body {
                self.anchor_debris(id, name);
            }
            self.notifier.emit(Notification {
                vehicle: id,
                kind: TransitionKind::Destroyed,
                body,
            });
        }
        Some(outcome)
    }

    /// Full reset of one vehicle back to free flight at its spawn state.
    pub fn reset_vehicle(&mut self, id: VehicleId) {
        if let Some(vehicle) = self.vehicles.get_mut(id.0) {
            vehicle.reset();
            info!(vehicle = vehicle.name(), "vehicle reset");
        }
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            time: self.elapsed,
            bodies: self
                .system
                .iter()
                .map(|(_, body)| BodySnapshot {
                    name: body.name.clone(),
                    position: body.position(),
                    velocity: body.velocity(),
                    orbit_angle: body.current_orbit_angle(),
                    radius: body.radius,
                    color: body.color,
                })
                .collect(),
            vehicles: self
                .vehicles
                .iter()
                .enumerate()
                .map(|(index, vehicle)| VehicleSnapshot {
                    id: VehicleId(index),
                    name: vehicle.name().to_string(),
                    position: vehicle.position(),
                    velocity: vehicle.velocity(),
                    angle: vehicle.angle(),
                    fuel: vehicle.fuel(),
                    health: vehicle.health(),
                    destroyed: vehicle.is_destroyed(),
                    landed: vehicle.is_landed(),
                    landed_on: vehicle.landed_on().map(str::to_string),
                    attached_to: vehicle.attached_to().map(str::to_string),
                })
                .collect(),
        }
    }

    fn track_attached(&mut self) {
        for vehicle in &mut self.vehicles {
            let Some(name) = vehicle.attached_to() else {
                continue;
            };
            let Some(body) = self.system.by_name(name) else {
                warn!(vehicle = vehicle.name(), body = name, "attached body not found");
                continue;
            };
            let pose = resolve(vehicle, body);
            let velocity = vehicle
                .snapshot()
                .map(|snapshot| surface_velocity(snapshot, body))
                .unwrap_or_else(|| body.velocity());
            let mut kinematics = vehicle.kinematics();
            kinematics.position = pose.position;
            kinematics.angle = pose.angle;
            kinematics.velocity = velocity;
            kinematics.angular_velocity = 0.0;
            vehicle.set_kinematics(kinematics);
        }
    }

    fn burn_fuel(&mut self, dt: f64) {
        for index in 0..self.vehicles.len() {
            let vehicle = &mut self.vehicles[index];
            if vehicle.is_destroyed() {
                continue;
            }
            let demand = vehicle.total_thrust();
            if demand > 0.0 && !vehicle.consume_fuel(demand * self.settings.fuel_burn_rate * dt) {
                debug!(vehicle = vehicle.name(), "fuel exhausted");
            }
            if vehicle.is_landed() && vehicle.thruster_power(ThrusterName::Main) > 0.0 {
                self.lift_off(VehicleId(index));
            }
        }
    }

    fn lift_off(&mut self, id: VehicleId) {
        let vehicle = &mut self.vehicles[id.0];
        let body = vehicle.landed_on().map(str::to_string);
        let velocity = body
            .as_deref()
            .and_then(|name| self.system.by_name(name))
            .map(|planet| match vehicle.snapshot() {
                Some(snapshot) => surface_velocity(snapshot, planet),
                None => planet.velocity(),
            })
            .unwrap_or(vehicle.velocity());
        vehicle.lift_off(velocity);
        info!(vehicle = vehicle.name(), body = ?body, "liftoff");
        self.notifier.emit(Notification {
            vehicle: id,
            kind: TransitionKind::Liftoff,
            body,
        });
    }

    fn fly_free(&mut self, dt: f64) -> Vec<ContactEvent> {
        let mut free: Vec<FreeBody> = self
            .vehicles
            .iter()
            .enumerate()
            .filter(|(_, vehicle)| vehicle.attached_to().is_none())
            .map(|(index, vehicle)| FreeBody {
                vehicle: VehicleId(index),
                kinematics: vehicle.kinematics(),
                mass: vehicle.mass(),
                half_height: vehicle.half_height(),
                thrust: vehicle.thrust(),
                touching: None,
            })
            .collect();
        if free.is_empty() {
            return Vec::new();
        }

        let contacts = self.dynamics.step(dt, &self.system, &mut free);
        for body in free {
            if let Some(vehicle) = self.vehicles.get_mut(body.vehicle.0) {
                vehicle.set_kinematics(body.kinematics);
                vehicle.set_contact(body.touching);
            }
        }
        contacts
    }

    fn handle_contact(&mut self, contact: ContactEvent) {
        let id = contact.vehicle;
        let Some(vehicle) = self.vehicles.get(id.0) else {
            warn!(vehicle = id.0, "contact reported for unknown vehicle");
            return;
        };
        if vehicle.is_destroyed() || vehicle.attached_to().is_some() {
            return;
        }
        let Some(body_id) = self.system.find(&contact.body) else {
            warn!(body = %contact.body, "contact reported for unknown body");
            return;
        };

        let thresholds = self.settings.thresholds_for(&contact.body);
        let outcome = classify(
            contact.contact_speed,
            contact.relative_angle_deg,
            contact.angular_velocity,
            thresholds,
        );
        match outcome {
            Outcome::Landed => self.land(id, body_id),
            Outcome::Crashed => self.crash(id, &contact.body),
            Outcome::Rejected => {
                debug!(
                    vehicle = vehicle.name(),
                    body = %contact.body,
                    speed = contact.contact_speed,
                    angle_deg = contact.relative_angle_deg,
                    "contact rejected; vehicle stays in flight"
                );
            }
        }
    }

    fn land(&mut self, id: VehicleId, body_id: BodyId) {
        let Some(body) = self.system.get(body_id) else {
            return;
        };
        let vehicle = &mut self.vehicles[id.0];

        // settle upright on the local radius before capturing
        let offset = vector::sub(&vehicle.position(), &body.position());
        let mut kinematics = vehicle.kinematics();
        if vector::norm(&offset) > DISTANCE_EPSILON {
            kinematics.angle = vector::bearing(&offset) + FRAC_PI_2;
        }
        kinematics.velocity = body.velocity();
        kinematics.angular_velocity = 0.0;
        vehicle.set_kinematics(kinematics);

        let snapshot = capture(vehicle, body);
        vehicle.land_on(&body.name, snapshot);
        info!(vehicle = vehicle.name(), body = %body.name, "landed");
        self.notifier.emit(Notification {
            vehicle: id,
            kind: TransitionKind::Landed,
            body: Some(body.name.clone()),
        });
    }

    fn crash(&mut self, id: VehicleId, body: &str) {
        let vehicle = &mut self.vehicles[id.0];
        vehicle.set_contact(Some(body.to_string()));
        if vehicle.apply_damage(f64::INFINITY) != DamageOutcome::Destroyed {
            return;
        }
        self.anchor_debris(id, body);
        info!(vehicle = self.vehicles[id.0].name(), body, "crashed");
        self.notifier.emit(Notification {
            vehicle: id,
            kind: TransitionKind::Crashed,
            body: Some(body.to_string()),
        });
    }

    fn anchor_debris(&mut self, id: VehicleId, body: &str) {
        let Some(planet) = self.system.by_name(body) else {
            warn!(body, "debris anchor body not found");
            return;
        };
        let vehicle = &mut self.vehicles[id.0];
        let snapshot = capture(vehicle, planet);
        vehicle.attach_debris(snapshot);
    }
}
