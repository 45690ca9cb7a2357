//! Orbital kinematics and surface attachment for a lander simulator.
//!
//! Bodies move on prescribed circular orbits, vehicles fly freely under an external
//! dynamics collaborator, and touchdowns hand vehicles over to an attachment regime in
//! which their pose is rebuilt every tick from a captured snapshot. The member crates
//! are re-exported here so front-ends only need this one dependency.

pub mod scenario;
pub mod simulation;

pub use lander_attachment as attachment;
pub use lander_config as config;
pub use lander_core as shared;
pub use lander_export as export;
pub use lander_orbits as orbits;
pub use lander_propulsion as propulsion;
pub use lander_touchdown as touchdown;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
