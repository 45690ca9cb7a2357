use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::sync::mpsc;

use lander_sim::orbits::{BodyDefinition, OrbitalSystem};
use lander_sim::propulsion::{
    AttachmentState, DamageOutcome, Kinematics, ThrusterName, VehicleSpec, VehicleState,
};
use lander_sim::shared::angle::wrap_positive;
use lander_sim::shared::vector;
use lander_sim::simulation::{
    ContactEvent, Dynamics, FreeBody, Notification, Simulation, StepSettings, TransitionKind,
    VehicleId,
};

/// Replays a fixed list of contact batches, one per call, and never moves anything.
#[derive(Default)]
struct ScriptedDynamics {
    batches: VecDeque<Vec<ContactEvent>>,
    calls: usize,
    seen: Vec<usize>,
}

impl ScriptedDynamics {
    fn with_contact(contact: ContactEvent) -> Self {
        Self {
            batches: VecDeque::from(vec![vec![contact]]),
            ..Self::default()
        }
    }
}

impl Dynamics for ScriptedDynamics {
    fn step(
        &mut self,
        _dt: f64,
        _system: &OrbitalSystem,
        vehicles: &mut [FreeBody],
    ) -> Vec<ContactEvent> {
        self.calls += 1;
        self.seen.push(vehicles.len());
        self.batches.pop_front().unwrap_or_default()
    }
}

fn system() -> OrbitalSystem {
    OrbitalSystem::new(vec![
        BodyDefinition::root("P", 1_000.0, 100.0, [0.0, 0.0]),
        BodyDefinition::orbiting("B", 10.0, 50.0, "P", 1_000.0, 0.01, 0.0),
    ])
    .unwrap()
}

fn vehicle(name: &str, position: [f64; 2], angle: f64) -> VehicleState {
    VehicleState::new(VehicleSpec {
        name: name.into(),
        mass: 10.0,
        width: 2.0,
        height: 4.0,
        fuel_capacity: 100.0,
        initial_fuel: 100.0,
        max_health: 100.0,
        max_power: [50.0, 10.0, 5.0, 5.0],
        spawn: Kinematics {
            position,
            velocity: [0.0, 0.0],
            angle,
            angular_velocity: 0.0,
        },
    })
}

fn contact(angle_deg: f64, speed: f64) -> ContactEvent {
    ContactEvent {
        vehicle: VehicleId(0),
        body: "B".into(),
        contact_speed: speed,
        relative_angle_deg: angle_deg,
        angular_velocity: 0.0,
    }
}

/// A vehicle resting 52 units above B's initial position, upright.
fn setup(
    dynamics: ScriptedDynamics,
) -> (
    Simulation<ScriptedDynamics>,
    mpsc::Receiver<Notification>,
) {
    let (sender, receiver) = mpsc::channel();
    let simulation = Simulation::new(
        system(),
        vec![vehicle("Lander", [1_000.0, 52.0], PI)],
        StepSettings::default(),
        dynamics,
    )
    .with_notifications(sender);
    (simulation, receiver)
}

fn offset_from_b(simulation: &Simulation<ScriptedDynamics>) -> [f64; 2] {
    let body = simulation.system().by_name("B").unwrap();
    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    vector::sub(&vehicle.position(), &body.position())
}

#[test]
fn gentle_contact_lands_and_notifies() {
    let (mut simulation, receiver) = setup(ScriptedDynamics::with_contact(contact(5.0, 100.0)));
    simulation.tick(1.0);

    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.attachment_state(), AttachmentState::Landed);
    assert_eq!(vehicle.landed_on(), Some("B"));
    assert_eq!(vehicle.attached_to(), Some("B"));
    assert!(vehicle.snapshot().is_some());

    let notes: Vec<_> = receiver.try_iter().collect();
    assert_eq!(
        notes,
        vec![Notification {
            vehicle: VehicleId(0),
            kind: TransitionKind::Landed,
            body: Some("B".into()),
        }]
    );
}

#[test]
fn attached_vehicle_follows_the_just_advanced_phase() {
    let (mut simulation, _receiver) = setup(ScriptedDynamics::with_contact(contact(0.0, 10.0)));
    simulation.tick(1.0);
    let captured = simulation
        .vehicle(VehicleId(0))
        .and_then(VehicleState::snapshot)
        .cloned()
        .unwrap();

    simulation.tick(2.0);
    let body = simulation.system().by_name("B").unwrap();
    assert!((body.current_orbit_angle() - 0.03).abs() < 1e-12);

    let offset = offset_from_b(&simulation);
    assert!((vector::norm(&offset) - captured.distance()).abs() < 1e-9);
    let expected = wrap_positive(captured.phase_relative_bearing() + body.current_orbit_angle());
    assert!((wrap_positive(vector::bearing(&offset)) - expected).abs() < 1e-9);

    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert!((vehicle.angle() - (vector::bearing(&offset) + FRAC_PI_2)).abs() < 1e-9);
    assert_eq!(vehicle.kinematics().angular_velocity, 0.0);
}

#[test]
fn attached_vehicles_are_not_handed_to_dynamics() {
    let (mut simulation, _receiver) = setup(ScriptedDynamics::with_contact(contact(0.0, 10.0)));
    simulation.tick(1.0);
    simulation.tick(1.0);
    simulation.tick(1.0);
    assert_eq!(simulation.dynamics().calls, 1);
    assert_eq!(simulation.dynamics().seen, vec![1]);
}

#[test]
fn steep_contact_crashes_into_debris_with_frozen_angle() {
    let (mut simulation, receiver) = setup(ScriptedDynamics::with_contact(contact(90.0, 100.0)));
    simulation.tick(1.0);

    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.attachment_state(), AttachmentState::DestroyedAttached);
    assert!(!vehicle.is_landed());
    assert_eq!(vehicle.health(), 0.0);
    let frozen = vehicle.angle();
    assert_eq!(frozen, PI);

    for _ in 0..50 {
        simulation.tick(1.0);
    }
    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.angle(), frozen);
    let distance = vector::norm(&offset_from_b(&simulation));
    let captured = vehicle.snapshot().unwrap().distance();
    assert!((distance - captured).abs() < 1e-9);

    let kinds: Vec<_> = receiver.try_iter().map(|note| note.kind).collect();
    assert_eq!(kinds, vec![TransitionKind::Crashed]);
}

#[test]
fn rejected_contact_stays_in_flight() {
    // between the landing and crash limits on speed
    let (mut simulation, receiver) = setup(ScriptedDynamics::with_contact(contact(0.0, 2_600.0)));
    simulation.tick(1.0);
    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.attachment_state(), AttachmentState::Flying);
    assert!(receiver.try_iter().next().is_none());
}

#[test]
fn main_thrust_lifts_off_a_landed_vehicle() {
    let (mut simulation, receiver) = setup(ScriptedDynamics::with_contact(contact(0.0, 10.0)));
    simulation.tick(1.0);
    simulation.set_thruster_power(VehicleId(0), ThrusterName::Main, 20.0);
    simulation.tick(1.0);

    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.attachment_state(), AttachmentState::Flying);
    assert!(vehicle.snapshot().is_none());
    assert!(vehicle.fuel() < 100.0);
    // leaves with the surface velocity: faster than the body's own orbital speed
    let body = simulation.system().by_name("B").unwrap();
    assert!(vector::norm(&vehicle.velocity()) > vector::norm(&body.velocity()));

    let kinds: Vec<_> = receiver.try_iter().map(|note| note.kind).collect();
    assert_eq!(kinds, vec![TransitionKind::Landed, TransitionKind::Liftoff]);
}

#[test]
fn damage_while_landed_leaves_debris_on_the_body() {
    let (mut simulation, receiver) = setup(ScriptedDynamics::with_contact(contact(0.0, 10.0)));
    simulation.tick(1.0);
    let landed_angle = simulation.vehicle(VehicleId(0)).unwrap().angle();

    assert_eq!(
        simulation.damage_vehicle(VehicleId(0), 40.0),
        Some(DamageOutcome::Damaged)
    );
    assert_eq!(
        simulation.damage_vehicle(VehicleId(0), 1e9),
        Some(DamageOutcome::Destroyed)
    );
    assert_eq!(
        simulation.damage_vehicle(VehicleId(0), 1e9),
        Some(DamageOutcome::AlreadyDestroyed)
    );
    assert_eq!(simulation.damage_vehicle(VehicleId(7), 1.0), None);

    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.attachment_state(), AttachmentState::DestroyedAttached);
    assert_eq!(vehicle.attached_to(), Some("B"));
    assert_eq!(vehicle.landed_on(), None);

    simulation.tick(10.0);
    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.angle(), landed_angle);

    let notes: Vec<_> = receiver.try_iter().collect();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].kind, TransitionKind::Destroyed);
    assert_eq!(notes[1].body.as_deref(), Some("B"));
}

#[test]
fn reset_returns_vehicle_to_spawn() {
    let (mut simulation, _receiver) = setup(ScriptedDynamics::with_contact(contact(90.0, 10.0)));
    simulation.tick(1.0);
    simulation.reset_vehicle(VehicleId(0));

    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.attachment_state(), AttachmentState::Flying);
    assert_eq!(vehicle.position(), [1_000.0, 52.0]);
    assert_eq!(vehicle.health(), 100.0);
    assert_eq!(vehicle.fuel(), 100.0);
    assert!(vehicle.snapshot().is_none());
}

#[test]
fn snapshot_reports_bodies_and_vehicles() {
    let (mut simulation, _receiver) = setup(ScriptedDynamics::default());
    simulation.tick(0.5);
    simulation.tick(0.5);
    let snapshot = simulation.snapshot();
    assert_eq!(snapshot.time, 1.0);
    assert_eq!(simulation.elapsed(), 1.0);
    assert_eq!(snapshot.bodies.len(), 2);
    assert_eq!(snapshot.vehicles.len(), 1);
    assert_eq!(snapshot.vehicles[0].name, "Lander");
    assert!(!snapshot.vehicles[0].landed);
    let b = snapshot.bodies.iter().find(|body| body.name == "B").unwrap();
    assert!((b.orbit_angle - 0.01).abs() < 1e-12);
    assert_eq!(simulation.find_vehicle("Lander"), Some(VehicleId(0)));
    assert_eq!(simulation.find_vehicle("Nobody"), None);
}

#[test]
fn dropped_receiver_does_not_stop_the_run() {
    let (mut simulation, receiver) = setup(ScriptedDynamics::with_contact(contact(0.0, 10.0)));
    drop(receiver);
    simulation.tick(1.0);
    assert!(simulation.vehicle(VehicleId(0)).unwrap().is_landed());
    for _ in 0..(TAU / 0.01) as usize {
        simulation.tick(1.0);
    }
    assert!(simulation.vehicle(VehicleId(0)).unwrap().is_landed());
}

#[test]
fn negative_damage_does_not_heal() {
    let (mut simulation, receiver) = setup(ScriptedDynamics::default());
    assert_eq!(
        simulation.damage_vehicle(VehicleId(0), -50.0),
        Some(DamageOutcome::Damaged)
    );
    assert_eq!(
        simulation.damage_vehicle(VehicleId(0), f64::NAN),
        Some(DamageOutcome::Damaged)
    );
    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.health(), 100.0);
    assert!(!vehicle.is_destroyed());
    assert!(receiver.try_iter().next().is_none());
}

#[test]
fn degenerate_landing_keeps_vehicle_angle() {
    let system = OrbitalSystem::new(vec![BodyDefinition::root("P", 1_000.0, 100.0, [0.0, 0.0])])
        .unwrap();
    let contact = ContactEvent {
        body: "P".into(),
        ..contact(0.0, 10.0)
    };
    let mut simulation = Simulation::new(
        system,
        vec![vehicle("Lander", [0.0, 1e-12], 0.3)],
        StepSettings::default(),
        ScriptedDynamics::with_contact(contact),
    );
    simulation.tick(1.0);

    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert!(vehicle.is_landed());
    assert_eq!(vehicle.angle(), 0.3);
    let snapshot = vehicle.snapshot().unwrap();
    assert_eq!(snapshot.bearing(), 0.0);
    assert!(snapshot.phase_relative_bearing().is_finite());
}

#[test]
fn liftoff_from_fixed_surface_starts_at_rest() {
    let system = OrbitalSystem::new(vec![
        BodyDefinition::root("P", 1_000.0, 100.0, [0.0, 0.0]),
        BodyDefinition::orbiting("F", 10.0, 50.0, "P", 5_000.0, 0.02, 0.0)
            .with_fixed_surface_frame(true),
    ])
    .unwrap();
    let contact = ContactEvent {
        body: "F".into(),
        ..contact(0.0, 10.0)
    };
    let mut simulation = Simulation::new(
        system,
        vec![vehicle("Lander", [5_000.0, 52.0], PI)],
        StepSettings::default(),
        ScriptedDynamics::with_contact(contact),
    );
    simulation.tick(1.0);
    assert!(simulation.vehicle(VehicleId(0)).unwrap().is_landed());

    simulation.tick(1.0);
    let pinned = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(pinned.velocity(), vector::ZERO);
    let body = simulation.system().by_name("F").unwrap();
    assert!(vector::norm(&body.velocity()) > 0.0);

    simulation.set_thruster_power(VehicleId(0), ThrusterName::Main, 20.0);
    simulation.tick(1.0);
    let vehicle = simulation.vehicle(VehicleId(0)).unwrap();
    assert_eq!(vehicle.attachment_state(), AttachmentState::Flying);
    assert_eq!(vehicle.velocity(), vector::ZERO);
}
