//! Touchdown classification.
//!
//! A contact between a vehicle and a body is judged in a fixed order: any crash
//! limit exceeded vetoes the touchdown, otherwise all landing limits must hold,
//! otherwise the contact is rejected and the vehicle stays in free flight.

use lander_core::angle::{to_degrees, wrap_signed};
use lander_core::vector::{self, Vector2};
use thiserror::Error;

/// Factor applied to the landing speed limit when no explicit crash speed is configured.
pub const DEFAULT_CRASH_SPEED_FACTOR: f64 = 1.1;

/// Result of judging a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Landed,
    Crashed,
    /// Neither a landing nor a crash: the vehicle keeps flying.
    Rejected,
}

/// Landing and crash limits. Angular velocity uses the vehicle's angular velocity unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub landing_max_speed: f64,
    pub landing_max_angle_deg: f64,
    pub landing_max_angular_velocity: f64,
    pub crash_speed: f64,
    pub crash_angle_deg: f64,
    pub crash_angular_velocity: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("threshold `{0}` must not be negative")]
    Negative(&'static str),
    #[error("landing limit `{landing}` exceeds crash limit `{crash}`")]
    LandingAboveCrash {
        landing: &'static str,
        crash: &'static str,
    },
}

impl Thresholds {
    /// Build thresholds, deriving the crash speed from the landing speed when absent.
    pub fn new(
        landing_max_speed: f64,
        landing_max_angle_deg: f64,
        landing_max_angular_velocity: f64,
        crash_speed: Option<f64>,
        crash_angle_deg: f64,
        crash_angular_velocity: f64,
    ) -> Self {
        Self {
            landing_max_speed,
            landing_max_angle_deg,
            landing_max_angular_velocity,
            crash_speed: crash_speed
                .unwrap_or(landing_max_speed * DEFAULT_CRASH_SPEED_FACTOR),
            crash_angle_deg,
            crash_angular_velocity,
        }
    }

    /// Check that limits are non-negative and landing limits sit inside crash limits.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let named = [
            ("landing_max_speed", self.landing_max_speed),
            ("landing_max_angle_deg", self.landing_max_angle_deg),
            ("landing_max_angular_velocity", self.landing_max_angular_velocity),
            ("crash_speed", self.crash_speed),
            ("crash_angle_deg", self.crash_angle_deg),
            ("crash_angular_velocity", self.crash_angular_velocity),
        ];
        if let Some((name, _)) = named.iter().find(|(_, value)| *value < 0.0) {
            return Err(ThresholdError::Negative(*name));
        }
        let pairs = [
            (
                "landing_max_speed",
                self.landing_max_speed,
                "crash_speed",
                self.crash_speed,
            ),
            (
                "landing_max_angle_deg",
                self.landing_max_angle_deg,
                "crash_angle_deg",
                self.crash_angle_deg,
            ),
            (
                "landing_max_angular_velocity",
                self.landing_max_angular_velocity,
                "crash_angular_velocity",
                self.crash_angular_velocity,
            ),
        ];
        for (landing, landing_value, crash, crash_value) in pairs {
            if landing_value > crash_value {
                return Err(ThresholdError::LandingAboveCrash { landing, crash });
            }
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(2_500.0, 30.0, 400.0, None, 45.0, 400.0)
    }
}

/// Classify a contact. First match wins: crash, then landing, then rejected.
pub fn classify(
    contact_speed: f64,
    vertical_angle_deviation_deg: f64,
    angular_velocity: f64,
    thresholds: &Thresholds,
) -> Outcome {
    let angle = vertical_angle_deviation_deg.abs();
    let spin = angular_velocity.abs();

    if contact_speed > thresholds.crash_speed
        || angle > thresholds.crash_angle_deg
        || spin > thresholds.crash_angular_velocity
    {
        return Outcome::Crashed;
    }

    if contact_speed <= thresholds.landing_max_speed
        && angle <= thresholds.landing_max_angle_deg
        && spin <= thresholds.landing_max_angular_velocity
    {
        return Outcome::Landed;
    }

    Outcome::Rejected
}

/// Signed deviation in degrees, in `(-180, 180]`, between the vehicle's up axis and the
/// local radial direction at `bearing`.
///
/// A vehicle at `angle` points its up axis along `angle - π/2`, so an upright vehicle
/// standing at bearing `b` has angle `b + π/2`.
pub fn vertical_deviation_deg(vehicle_angle: f64, bearing: f64) -> f64 {
    let up = vehicle_angle - std::f64::consts::FRAC_PI_2;
    to_degrees(wrap_signed(up - bearing))
}

/// Speed of the vehicle relative to the body it touched.
pub fn contact_speed(vehicle_velocity: Vector2, body_velocity: Vector2) -> f64 {
    vector::norm(&vector::sub(&vehicle_velocity, &body_velocity))
}
