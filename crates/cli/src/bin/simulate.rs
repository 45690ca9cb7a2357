use anyhow::{Context, anyhow, bail};
use clap::Parser;
use lander_sim::export::telemetry::{self, Metadata};
use lander_sim::export::track::{self, TrackRow};
use lander_sim::export::writer_for_path;
use lander_sim::propulsion::ThrusterName;
use lander_sim::scenario::load_scenario;
use lander_sim::shared::vector;
use lander_sim::simulation::{SystemSnapshot, TransitionKind, VehicleId, VehicleSnapshot};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SETTINGS: &str = "configs/simulation.toml";

/// Run a lander scenario headless and report touchdown transitions.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Headless lander scenario runner (orbits, touchdowns, attachment)"
)]
struct Cli {
    /// Body catalog: a directory of TOML files, a TOML file, or a YAML list
    #[arg(long, default_value = "configs/bodies")]
    bodies: PathBuf,

    /// Vehicle catalog: a directory of TOML files, a TOML file, or a YAML list
    #[arg(long, default_value = "configs/vehicles")]
    vehicles: PathBuf,

    /// Simulation settings (TOML). Falls back to configs/simulation.toml when present.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: usize,

    /// Tick length in seconds (defaults to the settings time step)
    #[arg(long)]
    dt: Option<f64>,

    /// Record a telemetry sample every N ticks
    #[arg(long, default_value_t = 10)]
    sample_every: usize,

    /// Telemetry JSON output (use '-' for stdout)
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Vehicle track CSV output (use '-' for stdout)
    #[arg(long)]
    track: Option<PathBuf>,

    /// Fire a thruster on every vehicle from the first tick, as THRUSTER=FRACTION of its
    /// maximum power (e.g. `main=0.5`). Repeatable.
    #[arg(long = "burn", value_parser = parse_burn)]
    burns: Vec<(ThrusterName, f64)>,
}

#[derive(Debug, Serialize)]
struct EventRecord {
    time_s: f64,
    tick: usize,
    vehicle: String,
    kind: TransitionKind,
    body: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if cli.ticks == 0 {
        bail!("--ticks must be at least 1");
    }
    if cli.sample_every == 0 {
        bail!("--sample-every must be at least 1");
    }

    let settings_path = cli.settings.clone().or_else(|| {
        let fallback = PathBuf::from(DEFAULT_SETTINGS);
        fallback.exists().then_some(fallback)
    });
    let scenario = load_scenario(&cli.bodies, &cli.vehicles, settings_path.as_deref())
        .with_context(|| {
            format!(
                "loading scenario from {} and {}",
                cli.bodies.display(),
                cli.vehicles.display()
            )
        })?;
    let dt = cli.dt.unwrap_or(scenario.settings.time_step);
    if !(dt.is_finite() && dt > 0.0) {
        bail!("tick length must be positive, got {dt}");
    }
    info!(
        bodies = scenario.system.len(),
        vehicles = scenario.vehicles.len(),
        dt,
        ticks = cli.ticks,
        "scenario loaded"
    );

    let (sender, receiver) = mpsc::channel();
    let mut simulation = scenario.into_simulation().with_notifications(sender);
    for (name, fraction) in &cli.burns {
        for index in 0..simulation.vehicles().len() {
            let id = VehicleId(index);
            let max_power = simulation
                .vehicle(id)
                .map_or(0.0, |vehicle| vehicle.max_thruster_power(*name));
            simulation.set_thruster_power(id, *name, fraction * max_power);
        }
        info!(thruster = name.as_str(), fraction, "burn requested");
    }
    let to_stdout = is_stdout(cli.telemetry.as_deref()) || is_stdout(cli.track.as_deref());

    let mut samples = vec![simulation.snapshot()];
    let mut events = Vec::new();
    for tick in 1..=cli.ticks {
        simulation.tick(dt);
        for notification in receiver.try_iter() {
            let vehicle = simulation
                .vehicle(notification.vehicle)
                .map(|v| v.name().to_string())
                .unwrap_or_else(|| format!("#{}", notification.vehicle.0));
            let record = EventRecord {
                time_s: simulation.elapsed(),
                tick,
                vehicle,
                kind: notification.kind,
                body: notification.body,
            };
            if !to_stdout {
                println!(
                    "t={:>9.3}s  {:<10} {:<9} {}",
                    record.time_s,
                    record.vehicle,
                    kind_label(record.kind),
                    record.body.as_deref().unwrap_or("-")
                );
            }
            events.push(record);
        }
        if tick % cli.sample_every == 0 || tick == cli.ticks {
            samples.push(simulation.snapshot());
        }
    }

    if !to_stdout {
        let last = simulation.snapshot();
        println!(
            "After {} ticks ({:.3} s): {} transition(s)",
            cli.ticks,
            last.time,
            events.len()
        );
        for vehicle in &last.vehicles {
            println!(
                "  {:<10} {:<9} fuel={:>8.2} health={:>8.2} pos=({:.1}, {:.1}) body={}",
                vehicle.name,
                state_label(vehicle),
                vehicle.fuel,
                vehicle.health,
                vehicle.position[0],
                vehicle.position[1],
                vehicle.attached_to.as_deref().unwrap_or("-")
            );
        }
    }

    if let Some(path) = &cli.telemetry {
        let mut writer = writer_for_path(path)
            .with_context(|| format!("opening telemetry output {}", path.display()))?;
        let meta = Metadata {
            scenario: &cli.bodies.display().to_string(),
            time_step_s: dt,
            ticks: cli.ticks,
        };
        telemetry::write_json(&mut *writer, &meta, &events, &samples)?;
        writer.flush()?;
    }

    if let Some(path) = &cli.track {
        let rows = track_rows(&samples);
        let mut writer = writer_for_path(path)
            .with_context(|| format!("opening track output {}", path.display()))?;
        track::write_csv(&mut *writer, &rows)?;
        writer.flush()?;
    }

    Ok(())
}

fn parse_burn(value: &str) -> anyhow::Result<(ThrusterName, f64)> {
    let (name, fraction) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("expected THRUSTER=FRACTION, got `{value}`"))?;
    let name: ThrusterName = name.trim().parse()?;
    let fraction: f64 = fraction
        .trim()
        .parse()
        .with_context(|| format!("invalid power fraction `{fraction}`"))?;
    if !(0.0..=1.0).contains(&fraction) {
        bail!("power fraction must be within [0, 1], got {fraction}");
    }
    Ok((name, fraction))
}

fn is_stdout(path: Option<&Path>) -> bool {
    path == Some(Path::new("-"))
}

fn track_rows(samples: &[SystemSnapshot]) -> Vec<TrackRow<'_>> {
    samples
        .iter()
        .flat_map(|sample| {
            sample.vehicles.iter().map(move |vehicle| TrackRow {
                time_s: sample.time,
                vehicle: &vehicle.name,
                x: vehicle.position[0],
                y: vehicle.position[1],
                angle_rad: vehicle.angle,
                speed: vector::norm(&vehicle.velocity),
                fuel: vehicle.fuel,
                health: vehicle.health,
                state: state_label(vehicle),
                body: vehicle.attached_to.as_deref().unwrap_or(""),
            })
        })
        .collect()
}

fn state_label(vehicle: &VehicleSnapshot) -> &'static str {
    match (vehicle.destroyed, vehicle.landed, vehicle.attached_to.is_some()) {
        (true, _, true) => "debris",
        (true, _, false) => "destroyed",
        (false, true, _) => "landed",
        (false, false, _) => "flying",
    }
}

fn kind_label(kind: TransitionKind) -> &'static str {
    match kind {
        TransitionKind::Landed => "landed",
        TransitionKind::Crashed => "crashed",
        TransitionKind::Destroyed => "destroyed",
        TransitionKind::Liftoff => "liftoff",
    }
}
