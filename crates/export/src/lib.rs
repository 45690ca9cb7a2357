//! Export helpers for CSV tracks and JSON telemetry sidecars.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod track {
    use std::io::{self, Write};

    use serde::Serialize;

    /// One vehicle at one sample time.
    #[derive(Debug, Clone, Serialize)]
    pub struct TrackRow<'a> {
        pub time_s: f64,
        pub vehicle: &'a str,
        pub x: f64,
        pub y: f64,
        pub angle_rad: f64,
        pub speed: f64,
        pub fuel: f64,
        pub health: f64,
        pub state: &'a str,
        pub body: &'a str,
    }

    /// Write rows as CSV with a header line.
    pub fn write_csv(writer: &mut dyn Write, rows: &[TrackRow<'_>]) -> io::Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for row in rows {
            csv.serialize(row)?;
        }
        csv.flush()?;
        Ok(())
    }
}

pub mod telemetry {
    use std::io::{self, Write};

    use serde::Serialize;
    use serde_json::to_writer_pretty;

    /// Metadata describing the run.
    #[derive(Debug)]
    pub struct Metadata<'a> {
        pub scenario: &'a str,
        pub time_step_s: f64,
        pub ticks: usize,
    }

    #[derive(Serialize)]
    struct Sidecar<'a, E, S> {
        generated_at: String,
        scenario: &'a str,
        time_step_s: f64,
        ticks: usize,
        duration_s: f64,
        events: &'a [E],
        samples: &'a [S],
    }

    /// Write a pretty JSON sidecar holding transition events and per-tick samples.
    pub fn write_json<E, S>(
        writer: &mut dyn Write,
        meta: &Metadata<'_>,
        events: &[E],
        samples: &[S],
    ) -> io::Result<()>
    where
        E: Serialize,
        S: Serialize,
    {
        let sidecar = Sidecar {
            generated_at: chrono::Utc::now().to_rfc3339(),
            scenario: meta.scenario,
            time_step_s: meta.time_step_s,
            ticks: meta.ticks,
            duration_s: meta.time_step_s * meta.ticks as f64,
            events,
            samples,
        };
        to_writer_pretty(&mut *writer, &sidecar)?;
        writeln!(writer)?;
        Ok(())
    }
}
