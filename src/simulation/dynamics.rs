//! Boundary with the rigid-body collaborator that moves free-flying vehicles.
//!
//! The orchestrator hands over every vehicle that is not attached to a body, together
//! with the just-advanced bodies, and receives updated kinematics plus discrete contact
//! events. [`PointGravityDynamics`] is a small reference collaborator used by the CLI and
//! tests; a host can plug in a full physics engine instead.

use std::collections::HashMap;

use lander_core::constants::DEFAULT_GRAVITATIONAL_CONSTANT;
use lander_core::vector::{self, Vector2};
use lander_orbits::OrbitalSystem;
use lander_propulsion::{Kinematics, ThrustOutput};
use lander_touchdown::{contact_speed, vertical_deviation_deg};

use super::VehicleId;

/// A vehicle handed to the dynamics collaborator for one tick.
#[derive(Debug, Clone)]
pub struct FreeBody {
    pub vehicle: VehicleId,
    pub kinematics: Kinematics,
    pub mass: f64,
    pub half_height: f64,
    pub thrust: ThrustOutput,
    /// Set by the collaborator to the body the vehicle is resting against, if any.
    pub touching: Option<String>,
}

/// A vehicle touched a body this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEvent {
    pub vehicle: VehicleId,
    pub body: String,
    pub contact_speed: f64,
    pub relative_angle_deg: f64,
    pub angular_velocity: f64,
}

/// Moves free-flying vehicles and reports contacts.
pub trait Dynamics {
    fn step(
        &mut self,
        dt: f64,
        system: &OrbitalSystem,
        vehicles: &mut [FreeBody],
    ) -> Vec<ContactEvent>;
}

/// Semi-implicit Euler under point-mass gravity with circular, inelastic surfaces.
///
/// A contact event is reported only when a vehicle first touches a body while closing
/// on it; resting contact afterwards is silent.
#[derive(Debug, Clone)]
pub struct PointGravityDynamics {
    pub gravitational_constant: f64,
    touching: HashMap<VehicleId, String>,
}

impl PointGravityDynamics {
    pub fn new(gravitational_constant: f64) -> Self {
        Self {
            gravitational_constant,
            touching: HashMap::new(),
        }
    }

    fn integrate(&self, dt: f64, system: &OrbitalSystem, body: &mut FreeBody) {
        let state = &mut body.kinematics;
        let mut acceleration = system.gravity_at(state.position, self.gravitational_constant);
        if body.mass > 0.0 {
            acceleration = vector::add(
                &acceleration,
                &vector::scale(&body.thrust.force, 1.0 / body.mass),
            );
        }
        state.velocity = vector::add(&state.velocity, &vector::scale(&acceleration, dt));
        state.position = vector::add(&state.position, &vector::scale(&state.velocity, dt));

        // thin rod about its center
        let inertia = body.mass * body.half_height * body.half_height / 3.0;
        if inertia > 0.0 {
            state.angular_velocity += body.thrust.torque / inertia * dt;
        }
        state.angle += state.angular_velocity * dt;
    }
}

impl Default for PointGravityDynamics {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITATIONAL_CONSTANT)
    }
}

impl Dynamics for PointGravityDynamics {
    fn step(
        &mut self,
        dt: f64,
        system: &OrbitalSystem,
        vehicles: &mut [FreeBody],
    ) -> Vec<ContactEvent> {
        let mut events = Vec::new();
        for free in vehicles.iter_mut() {
            self.integrate(dt, system, free);
            free.touching = None;

            for (_, body) in system.iter() {
                let offset = vector::sub(&free.kinematics.position, &body.position());
                let distance = vector::norm(&offset);
                let surface = body.radius + free.half_height;
                if distance >= surface {
                    continue;
                }

                let normal = surface_normal(&offset);
                let relative = vector::sub(&free.kinematics.velocity, &body.velocity());
                let radial = vector::dot(&relative, &normal);
                let first_touch = self.touching.get(&free.vehicle) != Some(&body.name);
                if first_touch && radial < 0.0 {
                    events.push(ContactEvent {
                        vehicle: free.vehicle,
                        body: body.name.clone(),
                        contact_speed: contact_speed(free.kinematics.velocity, body.velocity()),
                        relative_angle_deg: vertical_deviation_deg(
                            free.kinematics.angle,
                            vector::bearing(&normal),
                        ),
                        angular_velocity: free.kinematics.angular_velocity,
                    });
                }

                free.kinematics.position =
                    vector::add(&body.position(), &vector::scale(&normal, surface));
                if radial < 0.0 {
                    let tangential = vector::sub(&relative, &vector::scale(&normal, radial));
                    free.kinematics.velocity = vector::add(&body.velocity(), &tangential);
                }
                free.touching = Some(body.name.clone());
                break;
            }

            match &free.touching {
                Some(name) => {
                    self.touching.insert(free.vehicle, name.clone());
                }
                None => {
                    self.touching.remove(&free.vehicle);
                }
            }
        }
        events
    }
}

fn surface_normal(offset: &Vector2) -> Vector2 {
    let normal = vector::normalize_or_zero(offset);
    if normal == vector::ZERO {
        // dead center: push out along +y
        [0.0, 1.0]
    } else {
        normal
    }
}
