//! Vehicle state: kinematics, thrusters, fuel, structural health, and attachment bookkeeping.
//!
//! Resource exhaustion never fails: requests for thrust degrade to zero when the tank is
//! empty or the hull is destroyed, and destruction is a one-shot state transition.

use std::f64::consts::FRAC_PI_2;

use lander_core::frame::{Pose, RelativePositionSnapshot};
use lander_core::vector::{self, Vector2};
use thiserror::Error;
use tracing::{debug, info};

/// The four thrusters fitted to every vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrusterName {
    /// Bottom engine, pushes along the up axis.
    Main,
    /// Nose engine, pushes against the up axis.
    Top,
    /// Port side, pushes to the right and spins clockwise.
    Left,
    /// Starboard side, pushes to the left and spins counter-clockwise.
    Right,
}

impl ThrusterName {
    pub const ALL: [ThrusterName; 4] = [
        ThrusterName::Main,
        ThrusterName::Top,
        ThrusterName::Left,
        ThrusterName::Right,
    ];

    fn index(self) -> usize {
        match self {
            ThrusterName::Main => 0,
            ThrusterName::Top => 1,
            ThrusterName::Left => 2,
            ThrusterName::Right => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThrusterName::Main => "main",
            ThrusterName::Top => "top",
            ThrusterName::Left => "left",
            ThrusterName::Right => "right",
        }
    }
}

/// A thruster name that does not match any fitted thruster.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown thruster `{0}` (expected main, top, left or right)")]
pub struct UnknownThruster(pub String);

impl std::str::FromStr for ThrusterName {
    type Err = UnknownThruster;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "main" => Ok(ThrusterName::Main),
            "top" => Ok(ThrusterName::Top),
            "left" => Ok(ThrusterName::Left),
            "right" => Ok(ThrusterName::Right),
            other => Err(UnknownThruster(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Thruster {
    power: f64,
    max_power: f64,
}

/// Static description of a vehicle, used to build and to reset its state.
#[derive(Debug, Clone)]
pub struct VehicleSpec {
    pub name: String,
    pub mass: f64,
    pub width: f64,
    pub height: f64,
    pub fuel_capacity: f64,
    pub initial_fuel: f64,
    pub max_health: f64,
    /// Maximum power per thruster, indexed like [`ThrusterName::ALL`].
    pub max_power: [f64; 4],
    pub spawn: Kinematics,
}

/// Free-flight kinematics in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematics {
    pub position: Vector2,
    pub velocity: Vector2,
    pub angle: f64,
    pub angular_velocity: f64,
}

/// World-frame force and torque produced by the current thruster settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThrustOutput {
    pub force: Vector2,
    pub torque: f64,
}

/// Result of [`VehicleState::apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Health dropped but stayed positive.
    Damaged,
    /// Health crossed zero on this call.
    Destroyed,
    /// The vehicle was already destroyed; nothing changed.
    AlreadyDestroyed,
}

/// Where a vehicle sits in the attachment state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    Flying,
    Landed,
    DestroyedAttached,
    DestroyedFree,
}

/// Kinematic and resource state of one vehicle.
#[derive(Debug, Clone)]
pub struct VehicleState {
    spec: VehicleSpec,
    kinematics: Kinematics,
    thrusters: [Thruster; 4],
    fuel: f64,
    health: f64,
    destroyed: bool,
    landed: bool,
    landed_on: Option<String>,
    attached_to: Option<String>,
    contact: Option<String>,
    snapshot: Option<RelativePositionSnapshot>,
}

impl VehicleState {
    pub fn new(spec: VehicleSpec) -> Self {
        let thrusters = spec.max_power.map(|max_power| Thruster {
            power: 0.0,
            max_power: max_power.max(0.0),
        });
        let fuel = spec.initial_fuel.clamp(0.0, spec.fuel_capacity.max(0.0));
        Self {
            kinematics: spec.spawn,
            thrusters,
            fuel,
            health: spec.max_health,
            destroyed: false,
            landed: false,
            landed_on: None,
            attached_to: None,
            contact: None,
            snapshot: None,
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn mass(&self) -> f64 {
        self.spec.mass
    }

    pub fn half_height(&self) -> f64 {
        self.spec.height * 0.5
    }

    pub fn kinematics(&self) -> Kinematics {
        self.kinematics
    }

    pub fn set_kinematics(&mut self, kinematics: Kinematics) {
        self.kinematics = kinematics;
    }

    pub fn position(&self) -> Vector2 {
        self.kinematics.position
    }

    pub fn velocity(&self) -> Vector2 {
        self.kinematics.velocity
    }

    pub fn angle(&self) -> f64 {
        self.kinematics.angle
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.kinematics.position,
            angle: self.kinematics.angle,
        }
    }

    /// Overwrite position and angle, e.g. from an attachment tracker.
    pub fn set_pose(&mut self, pose: Pose) {
        self.kinematics.position = pose.position;
        self.kinematics.angle = pose.angle;
    }

    /// Unit vector of the vehicle's up axis (from tail to nose).
    pub fn up_axis(&self) -> Vector2 {
        vector::from_angle(self.kinematics.angle - FRAC_PI_2)
    }

    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_landed(&self) -> bool {
        self.landed
    }

    pub fn landed_on(&self) -> Option<&str> {
        self.landed_on.as_deref()
    }

    pub fn attached_to(&self) -> Option<&str> {
        self.attached_to.as_deref()
    }

    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref()
    }

    /// Record the body the vehicle is touching, as reported by the dynamics collaborator.
    pub fn set_contact(&mut self, body: Option<String>) {
        self.contact = body;
    }

    pub fn snapshot(&self) -> Option<&RelativePositionSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn attachment_state(&self) -> AttachmentState {
        match (self.destroyed, self.landed, self.attached_to.is_some()) {
            (true, _, true) => AttachmentState::DestroyedAttached,
            (true, _, false) => AttachmentState::DestroyedFree,
            (false, true, _) => AttachmentState::Landed,
            (false, false, _) => AttachmentState::Flying,
        }
    }

    fn can_fire(&self) -> bool {
        self.fuel > 0.0 && !self.destroyed
    }

    /// Set a thruster's power. Values are clamped to `[0, max_power]` and forced to zero when
    /// the tank is empty or the vehicle is destroyed.
    pub fn set_thruster_power(&mut self, name: ThrusterName, power: f64) {
        let allowed = self.can_fire();
        let thruster = &mut self.thrusters[name.index()];
        thruster.power = if allowed && power.is_finite() {
            power.clamp(0.0, thruster.max_power)
        } else {
            0.0
        };
    }

    pub fn thruster_power(&self, name: ThrusterName) -> f64 {
        if self.can_fire() {
            self.thrusters[name.index()].power
        } else {
            0.0
        }
    }

    pub fn max_thruster_power(&self, name: ThrusterName) -> f64 {
        self.thrusters[name.index()].max_power
    }

    /// Sum of all thruster powers currently applied.
    pub fn total_thrust(&self) -> f64 {
        ThrusterName::ALL
            .iter()
            .map(|name| self.thruster_power(*name))
            .sum()
    }

    fn cut_thrusters(&mut self) {
        for thruster in &mut self.thrusters {
            thruster.power = 0.0;
        }
    }

    /// Burn `amount` of fuel. Returns whether any fuel remains.
    pub fn consume_fuel(&mut self, amount: f64) -> bool {
        self.fuel = (self.fuel - amount.max(0.0)).max(0.0);
        if self.fuel <= 0.0 {
            self.cut_thrusters();
            false
        } else {
            true
        }
    }

    /// Apply structural damage. Destruction happens at most once.
    ///
    /// Health stays within `[0, max_health]`: negative or NaN amounts count as no damage.
    ///
    /// When the vehicle is touching a body at the moment of destruction it becomes attached
    /// to that body as debris (without being marked landed).
    pub fn apply_damage(&mut self, amount: f64) -> DamageOutcome {
        if self.destroyed {
            return DamageOutcome::AlreadyDestroyed;
        }
        // NaN and negative amounts never heal; +inf destroys outright
        let amount = if amount.is_nan() { 0.0 } else { amount.max(0.0) };
        self.health = (self.health - amount).clamp(0.0, self.spec.max_health.max(0.0));
        if self.health > 0.0 {
            debug!(vehicle = %self.spec.name, health = self.health, "vehicle damaged");
            return DamageOutcome::Damaged;
        }

        self.health = 0.0;
        self.destroyed = true;
        self.landed = false;
        self.landed_on = None;
        self.cut_thrusters();
        let anchor = self.contact.clone().or_else(|| self.attached_to.clone());
        if anchor.is_none() {
            // free-flying wreck follows the collaborator's dynamics
            self.snapshot = None;
        }
        self.attached_to = anchor;
        info!(
            vehicle = %self.spec.name,
            attached_to = ?self.attached_to,
            "vehicle destroyed"
        );
        DamageOutcome::Destroyed
    }

    /// Mark the vehicle as landed on `body`, anchored by `snapshot`.
    pub fn land_on(&mut self, body: &str, snapshot: RelativePositionSnapshot) {
        if self.destroyed {
            return;
        }
        self.landed = true;
        self.landed_on = Some(body.to_string());
        self.attached_to = Some(body.to_string());
        self.contact = Some(body.to_string());
        self.snapshot = Some(snapshot);
        self.kinematics.angular_velocity = 0.0;
    }

    /// Anchor a destroyed vehicle to the body it is attached to.
    pub fn attach_debris(&mut self, snapshot: RelativePositionSnapshot) {
        if self.destroyed && self.attached_to.is_some() {
            self.snapshot = Some(snapshot);
            self.kinematics.angular_velocity = 0.0;
        }
    }

    /// Leave the surface and return to free flight with `velocity`.
    pub fn lift_off(&mut self, velocity: Vector2) {
        if !self.landed || self.destroyed {
            return;
        }
        self.landed = false;
        self.landed_on = None;
        self.attached_to = None;
        self.contact = None;
        self.snapshot = None;
        self.kinematics.velocity = velocity;
    }

    /// Full reset: back to the spawn kinematics in free flight with full health and starting fuel.
    pub fn reset(&mut self) {
        *self = VehicleState::new(self.spec.clone());
    }

    /// World-frame force and torque from the current thruster powers.
    ///
    /// Side thrusters act at the nose, half the hull height from the center.
    pub fn thrust(&self) -> ThrustOutput {
        let up = self.up_axis();
        let right = [up[1], -up[0]];
        let main = self.thruster_power(ThrusterName::Main);
        let top = self.thruster_power(ThrusterName::Top);
        let left = self.thruster_power(ThrusterName::Left);
        let right_power = self.thruster_power(ThrusterName::Right);

        let axial = vector::scale(&up, main - top);
        let lateral = vector::scale(&right, left - right_power);
        ThrustOutput {
            force: vector::add(&axial, &lateral),
            torque: (right_power - left) * self.half_height(),
        }
    }
}
