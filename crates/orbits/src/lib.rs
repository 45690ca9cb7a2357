//! Celestial bodies on prescribed circular orbits.
//!
//! Bodies live in a flat arena owned by [`OrbitalSystem`] and refer to their parent
//! by index. The system advances them in tree-depth order so a child always sees
//! its parent's position for the current tick. Orbits are analytic: bodies never
//! perturb one another.

use std::collections::HashMap;
use std::f64::consts::TAU;

use lander_core::angle::wrap_positive;
use lander_core::constants::DISTANCE_EPSILON;
use lander_core::vector::{self, Vector2};
use thiserror::Error;
use tracing::warn;

/// Index of a body inside its [`OrbitalSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub usize);

/// Construction input for a body. Parents are referenced by name.
#[derive(Debug, Clone)]
pub struct BodyDefinition {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    pub color: [u8; 3],
    pub parent: Option<String>,
    pub orbit_distance: f64,
    pub orbit_speed: f64,
    pub initial_phase: f64,
    /// Position of a root body. Ignored for bodies with a parent.
    pub position: Vector2,
    pub fixed_surface_frame: bool,
}

impl BodyDefinition {
    /// A stationary root body at `position`.
    pub fn root(name: impl Into<String>, mass: f64, radius: f64, position: Vector2) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            color: [255, 255, 255],
            parent: None,
            orbit_distance: 0.0,
            orbit_speed: 0.0,
            initial_phase: 0.0,
            position,
            fixed_surface_frame: false,
        }
    }

    /// A body on a circular orbit around `parent`.
    pub fn orbiting(
        name: impl Into<String>,
        mass: f64,
        radius: f64,
        parent: impl Into<String>,
        orbit_distance: f64,
        orbit_speed: f64,
        initial_phase: f64,
    ) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            color: [255, 255, 255],
            parent: Some(parent.into()),
            orbit_distance,
            orbit_speed,
            initial_phase,
            position: vector::ZERO,
            fixed_surface_frame: false,
        }
    }

    pub fn with_fixed_surface_frame(mut self, fixed: bool) -> Self {
        self.fixed_surface_frame = fixed;
        self
    }
}

/// Kinematics of a parent body, passed to children while advancing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentFrame {
    pub position: Vector2,
    pub velocity: Vector2,
}

/// A celestial body whose position is a pure function of its orbital phase.
#[derive(Debug, Clone)]
pub struct OrbitalBody {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    pub color: [u8; 3],
    pub orbit_distance: f64,
    pub orbit_speed: f64,
    parent: Option<BodyId>,
    current_orbit_angle: f64,
    position: Vector2,
    velocity: Vector2,
    fixed_surface_frame: bool,
}

impl OrbitalBody {
    /// Advance the orbital phase by `dt` seconds and recompute position and velocity.
    ///
    /// Root bodies are stationary references and ignore the call. A body whose parent
    /// frame is unavailable keeps its current state.
    pub fn advance(&mut self, dt: f64, parent: Option<ParentFrame>) {
        if self.parent.is_none() {
            return;
        }
        let Some(parent) = parent else {
            warn!(body = %self.name, "parent frame missing; holding orbital state");
            return;
        };
        self.current_orbit_angle = wrap_positive(self.current_orbit_angle + self.orbit_speed * dt);
        self.place(parent);
    }

    fn place(&mut self, parent: ParentFrame) {
        let radial = vector::from_angle(self.current_orbit_angle);
        self.position = vector::add(&parent.position, &vector::scale(&radial, self.orbit_distance));
        let tangential_speed = self.orbit_speed * self.orbit_distance;
        let tangent = [-radial[1], radial[0]];
        self.velocity = vector::add(&vector::scale(&tangent, tangential_speed), &parent.velocity);
    }

    pub fn parent(&self) -> Option<BodyId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Current orbital phase in `[0, 2π)`.
    pub fn current_orbit_angle(&self) -> f64 {
        self.current_orbit_angle
    }

    /// Phase that drives the body's surface frame: zero for root bodies, which never rotate.
    pub fn surface_phase(&self) -> f64 {
        if self.is_root() {
            0.0
        } else {
            self.current_orbit_angle
        }
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    pub fn is_fixed_surface_frame(&self) -> bool {
        self.fixed_surface_frame
    }

    /// Time for one full revolution, if the body moves at all.
    pub fn period(&self) -> Option<f64> {
        if self.is_root() || self.orbit_speed == 0.0 {
            None
        } else {
            Some(TAU / self.orbit_speed.abs())
        }
    }

    fn frame(&self) -> ParentFrame {
        ParentFrame {
            position: self.position,
            velocity: self.velocity,
        }
    }
}

/// Errors raised while assembling an [`OrbitalSystem`].
#[derive(Debug, Error, PartialEq)]
pub enum OrbitError {
    #[error("body name `{0}` is defined more than once")]
    DuplicateName(String),
    #[error("body `{body}` references unknown parent `{parent}`")]
    UnknownParent { body: String, parent: String },
    #[error("body `{0}` is part of a parent cycle")]
    ParentCycle(String),
    #[error("body `{0}` must have positive mass")]
    InvalidMass(String),
    #[error("body `{0}` must have positive radius")]
    InvalidRadius(String),
    #[error("body `{0}` must have a non-negative orbit distance")]
    InvalidOrbitDistance(String),
}

/// Flat arena of bodies with a parents-first update order.
#[derive(Debug, Clone)]
pub struct OrbitalSystem {
    bodies: Vec<OrbitalBody>,
    order: Vec<BodyId>,
    by_name: HashMap<String, BodyId>,
}

impl OrbitalSystem {
    /// Validate definitions, resolve parents to indices, and place every body at its initial phase.
    pub fn new(definitions: Vec<BodyDefinition>) -> Result<Self, OrbitError> {
        let mut by_name = HashMap::with_capacity(definitions.len());
        for (index, definition) in definitions.iter().enumerate() {
            if definition.mass <= 0.0 {
                return Err(OrbitError::InvalidMass(definition.name.clone()));
            }
            if definition.radius <= 0.0 {
                return Err(OrbitError::InvalidRadius(definition.name.clone()));
            }
            if definition.orbit_distance < 0.0 {
                return Err(OrbitError::InvalidOrbitDistance(definition.name.clone()));
            }
            if by_name
                .insert(definition.name.clone(), BodyId(index))
                .is_some()
            {
                return Err(OrbitError::DuplicateName(definition.name.clone()));
            }
        }

        let mut bodies = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let parent = match &definition.parent {
                Some(parent) => Some(*by_name.get(parent).ok_or_else(|| {
                    OrbitError::UnknownParent {
                        body: definition.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };
            bodies.push(OrbitalBody {
                name: definition.name,
                mass: definition.mass,
                radius: definition.radius,
                color: definition.color,
                orbit_distance: definition.orbit_distance,
                orbit_speed: definition.orbit_speed,
                parent,
                current_orbit_angle: wrap_positive(definition.initial_phase),
                position: definition.position,
                velocity: vector::ZERO,
                fixed_surface_frame: definition.fixed_surface_frame,
            });
        }

        let order = depth_order(&bodies)?;
        let mut system = Self {
            bodies,
            order,
            by_name,
        };
        system.advance(0.0);
        Ok(system)
    }

    /// Advance every body by `dt`, parents before children.
    pub fn advance(&mut self, dt: f64) {
        for position in 0..self.order.len() {
            let id = self.order[position];
            let parent = self.bodies[id.0]
                .parent
                .and_then(|parent| self.bodies.get(parent.0))
                .map(OrbitalBody::frame);
            self.bodies[id.0].advance(dt, parent);
        }
    }

    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: BodyId) -> Option<&OrbitalBody> {
        self.bodies.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&OrbitalBody> {
        self.find(name).and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &OrbitalBody)> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(index, body)| (BodyId(index), body))
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Bodies in the order they are advanced.
    pub fn update_order(&self) -> &[BodyId] {
        &self.order
    }

    /// Point-mass gravitational acceleration at `point` from every body.
    ///
    /// Bodies whose center coincides with `point` contribute nothing.
    pub fn gravity_at(&self, point: Vector2, gravitational_constant: f64) -> Vector2 {
        self.bodies.iter().fold(vector::ZERO, |total, body| {
            let offset = vector::sub(&body.position, &point);
            let distance_sq = vector::dot(&offset, &offset);
            if distance_sq <= DISTANCE_EPSILON * DISTANCE_EPSILON {
                return total;
            }
            let magnitude = gravitational_constant * body.mass / distance_sq;
            let direction = vector::scale(&offset, 1.0 / distance_sq.sqrt());
            vector::add(&total, &vector::scale(&direction, magnitude))
        })
    }
}

fn depth_order(bodies: &[OrbitalBody]) -> Result<Vec<BodyId>, OrbitError> {
    let mut depths = Vec::with_capacity(bodies.len());
    for body in bodies {
        let mut depth = 0usize;
        let mut cursor = body.parent;
        while let Some(parent) = cursor {
            depth += 1;
            if depth > bodies.len() {
                return Err(OrbitError::ParentCycle(body.name.clone()));
            }
            cursor = bodies[parent.0].parent;
        }
        depths.push(depth);
    }
    let mut order: Vec<BodyId> = (0..bodies.len()).map(BodyId).collect();
    order.sort_by_key(|id| depths[id.0]);
    Ok(order)
}
