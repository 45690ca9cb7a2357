//! Core constants, angle helpers, and shared frame primitives for the lander simulator workspace.

/// Numeric constants shared across crates.
pub mod constants {
    /// Distances below this are treated as coincident points.
    pub const DISTANCE_EPSILON: f64 = 1.0e-9;
    /// Gravitational constant in simulation units (masses and distances are unscaled).
    pub const DEFAULT_GRAVITATIONAL_CONSTANT: f64 = 1.0;
}

/// Angle helpers. All angles are radians unless the name says otherwise.
pub mod angle {
    use std::f64::consts::{PI, TAU};

    /// Wrap an angle into `[0, 2π)`.
    #[inline]
    pub fn wrap_positive(angle: f64) -> f64 {
        let wrapped = angle.rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs
        if wrapped >= TAU { 0.0 } else { wrapped }
    }

    /// Wrap an angle into `(-π, π]`.
    #[inline]
    pub fn wrap_signed(angle: f64) -> f64 {
        let wrapped = wrap_positive(angle);
        if wrapped > PI { wrapped - TAU } else { wrapped }
    }

    /// Convert radians to degrees.
    #[inline]
    pub fn to_degrees(radians: f64) -> f64 {
        radians.to_degrees()
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 2]` math everywhere.
pub mod vector {
    use super::constants::DISTANCE_EPSILON;

    /// Alias for a 2D vector in the world frame.
    pub type Vector2 = [f64; 2];

    /// The zero vector.
    pub const ZERO: Vector2 = [0.0, 0.0];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector2) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector2, b: &Vector2) -> f64 {
        a[0] * b[0] + a[1] * b[1]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector2, b: &Vector2) -> Vector2 {
        [a[0] + b[0], a[1] + b[1]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector2, b: &Vector2) -> Vector2 {
        [a[0] - b[0], a[1] - b[1]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector2, s: f64) -> Vector2 {
        [v[0] * s, v[1] * s]
    }

    /// Unit vector pointing along `angle`.
    #[inline]
    pub fn from_angle(angle: f64) -> Vector2 {
        [angle.cos(), angle.sin()]
    }

    /// Bearing of a vector, `atan2(y, x)`.
    #[inline]
    pub fn bearing(v: &Vector2) -> f64 {
        v[1].atan2(v[0])
    }

    /// Unit vector along `v`, or the zero vector when `v` is degenerate.
    #[inline]
    pub fn normalize_or_zero(v: &Vector2) -> Vector2 {
        let length = norm(v);
        if length <= DISTANCE_EPSILON {
            ZERO
        } else {
            scale(v, 1.0 / length)
        }
    }
}

/// Pose and attachment-frame primitives shared by the vehicle and tracker crates.
pub mod frame {
    use serde::Serialize;

    use super::vector::Vector2;

    /// Absolute position and orientation in the world frame.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct Pose {
        pub position: Vector2,
        pub angle: f64,
    }

    /// Geometry of a vehicle relative to a body, captured when an attachment begins.
    ///
    /// A snapshot is immutable once built: trackers only read it to regenerate the
    /// absolute pose as the body moves. A new attachment produces a new snapshot.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RelativePositionSnapshot {
        distance: f64,
        bearing: f64,
        body_phase: f64,
        vehicle_angle: f64,
        phase_relative_bearing: f64,
        absolute: Pose,
    }

    /// Raw parts used to build a [`RelativePositionSnapshot`].
    #[derive(Debug, Clone, Copy)]
    pub struct SnapshotParts {
        pub distance: f64,
        pub bearing: f64,
        pub body_phase: f64,
        pub vehicle_angle: f64,
        pub phase_relative_bearing: f64,
        pub absolute: Pose,
    }

    impl RelativePositionSnapshot {
        pub fn new(parts: SnapshotParts) -> Self {
            Self {
                distance: parts.distance,
                bearing: parts.bearing,
                body_phase: parts.body_phase,
                vehicle_angle: parts.vehicle_angle,
                phase_relative_bearing: parts.phase_relative_bearing,
                absolute: parts.absolute,
            }
        }

        /// Distance from the body center at capture time.
        pub fn distance(&self) -> f64 {
            self.distance
        }

        /// Absolute bearing from the body center at capture time.
        pub fn bearing(&self) -> f64 {
            self.bearing
        }

        pub fn body_phase(&self) -> f64 {
            self.body_phase
        }

        pub fn vehicle_angle(&self) -> f64 {
            self.vehicle_angle
        }

        /// Bearing measured from the body's surface phase, so it can be re-projected later.
        pub fn phase_relative_bearing(&self) -> f64 {
            self.phase_relative_bearing
        }

        /// Absolute pose at capture time, recalled verbatim for fixed surface frames.
        pub fn absolute(&self) -> Pose {
            self.absolute
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{PI, TAU};

    use super::angle::{wrap_positive, wrap_signed};
    use super::vector::{self, normalize_or_zero};

    #[test]
    fn wrap_positive_stays_in_range() {
        assert_eq!(wrap_positive(0.0), 0.0);
        assert!((wrap_positive(TAU + 0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_positive(-0.5) - (TAU - 0.5)).abs() < 1e-12);
        assert!(wrap_positive(-1.0e-18) < TAU);
        assert_eq!(wrap_positive(TAU), 0.0);
    }

    #[test]
    fn wrap_signed_prefers_positive_half_turn() {
        assert!((wrap_signed(PI) - PI).abs() < 1e-12);
        assert!((wrap_signed(-PI) - PI).abs() < 1e-12);
        assert!((wrap_signed(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn degenerate_vector_normalizes_to_zero() {
        assert_eq!(normalize_or_zero(&[0.0, 0.0]), vector::ZERO);
        let unit = normalize_or_zero(&[3.0, 4.0]);
        assert!((vector::norm(&unit) - 1.0).abs() < 1e-12);
    }
}
