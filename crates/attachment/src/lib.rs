//! Surface attachment tracking.
//!
//! When a vehicle lands on (or is wrecked against) a body, [`capture`] records where it
//! sits relative to the body's center and surface phase. Every tick afterwards,
//! [`resolve`] regenerates the absolute pose from that snapshot and the body's current
//! phase, so the vehicle rides the surface as the body orbits.
//!
//! Landed vehicles are kept upright against the local radius. Debris keeps the
//! orientation it had when it was destroyed and only translates with its surface point.

use std::f64::consts::FRAC_PI_2;

use lander_core::constants::DISTANCE_EPSILON;
use lander_core::frame::{Pose, RelativePositionSnapshot, SnapshotParts};
use lander_core::vector::{self, Vector2};
use lander_orbits::OrbitalBody;
use lander_propulsion::VehicleState;
use tracing::warn;

/// Record the vehicle's position relative to `body` at this instant.
///
/// A vehicle sitting exactly on the body's center has no direction; the offset direction
/// and bearing default to zero rather than producing NaN.
pub fn capture(vehicle: &VehicleState, body: &OrbitalBody) -> RelativePositionSnapshot {
    let offset = vector::sub(&vehicle.position(), &body.position());
    let distance = vector::norm(&offset);
    let bearing = if distance <= DISTANCE_EPSILON {
        0.0
    } else {
        vector::bearing(&offset)
    };
    let body_phase = body.surface_phase();

    RelativePositionSnapshot::new(SnapshotParts {
        distance,
        bearing,
        body_phase,
        vehicle_angle: vehicle.angle(),
        phase_relative_bearing: bearing - body_phase,
        absolute: vehicle.pose(),
    })
}

/// Absolute pose of an attached vehicle for the body's current phase.
///
/// Without a snapshot the vehicle's current pose is returned unchanged.
pub fn resolve(vehicle: &VehicleState, body: &OrbitalBody) -> Pose {
    let Some(snapshot) = vehicle.snapshot() else {
        warn!(
            vehicle = vehicle.name(),
            body = %body.name,
            "resolve called without a captured snapshot; keeping last pose"
        );
        return vehicle.pose();
    };
    resolve_snapshot(snapshot, body, vehicle.is_destroyed())
}

/// Pose for `snapshot` at the body's current phase. `frozen` keeps the captured angle.
pub fn resolve_snapshot(snapshot: &RelativePositionSnapshot, body: &OrbitalBody, frozen: bool) -> Pose {
    if body.is_fixed_surface_frame() {
        return snapshot.absolute();
    }

    let absolute_bearing = absolute_bearing(snapshot, body);
    let position = vector::add(
        &body.position(),
        &vector::scale(&vector::from_angle(absolute_bearing), snapshot.distance()),
    );
    let angle = if frozen {
        snapshot.vehicle_angle()
    } else {
        absolute_bearing + FRAC_PI_2
    };
    Pose { position, angle }
}

/// Velocity of the surface point tracked by `snapshot`.
///
/// The surface turns with the body's orbital rate, so the point moves with the body's
/// velocity plus its own rotation about the center. Points on a fixed surface frame are
/// pinned to their captured absolute pose and do not move.
pub fn surface_velocity(snapshot: &RelativePositionSnapshot, body: &OrbitalBody) -> Vector2 {
    if body.is_fixed_surface_frame() {
        return vector::ZERO;
    }
    if body.is_root() {
        return body.velocity();
    }
    let bearing = absolute_bearing(snapshot, body);
    let tangent = [-bearing.sin(), bearing.cos()];
    vector::add(
        &body.velocity(),
        &vector::scale(&tangent, body.orbit_speed * snapshot.distance()),
    )
}

fn absolute_bearing(snapshot: &RelativePositionSnapshot, body: &OrbitalBody) -> f64 {
    body.surface_phase() + snapshot.phase_relative_bearing()
}
