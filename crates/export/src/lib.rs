//! Export helpers for CSV and JSON artifacts.

pub mod trace {
    use std::fs::{self, File};
    use std::io::{self, BufWriter, Write};
    use std::path::Path;

    const HEADER: &str = "time_s,car,system,controller,pipe_psi,cylinder_psi,reservoir_psi,handbrake_percent,retard_force_n,brake_force_n,connected";

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

    /// Write the standard brake trace CSV header.
    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// CSV row emitted once per car per sampled tick.
    #[derive(Debug, Clone)]
    pub struct Record<'a> {
        pub time_s: f64,
        pub car: &'a str,
        pub system: &'a str,
        pub controller: &'a str,
        pub pipe_psi: f64,
        pub cylinder_psi: f64,
        pub reservoir_psi: Option<f64>,
        pub handbrake_percent: f64,
        pub retard_force_n: f64,
        pub brake_force_n: f64,
        pub connected: bool,
    }

    impl<'a> Record<'a> {
        /// Serialize the record to CSV, matching the standard header ordering.
        pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
            let reservoir = self
                .reservoir_psi
                .map(|p| format!("{p:.4}"))
                .unwrap_or_default();
            writeln!(
                writer,
                "{:.3},{},{},{},{:.4},{:.4},{},{:.1},{:.2},{:.2},{}",
                self.time_s,
                quote(self.car),
                self.system,
                self.controller,
                self.pipe_psi,
                self.cylinder_psi,
                reservoir,
                self.handbrake_percent,
                self.retard_force_n,
                self.brake_force_n,
                if self.connected { "true" } else { "false" },
            )
        }
    }

    /// Car ids come from file names and may contain commas.
    fn quote(field: &str) -> String {
        if field.contains([',', '"', '\n']) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn record_matches_header_columns() {
            let record = Record {
                time_s: 1.5,
                car: "GWR Vans/van.wag",
                system: "automatic_vacuum",
                controller: "apply",
                pipe_psi: 9.0,
                cylinder_psi: 10.25,
                reservoir_psi: None,
                handbrake_percent: 0.0,
                retard_force_n: 1234.5,
                brake_force_n: 1000.0,
                connected: true,
            };
            let mut out = Vec::new();
            write_header(&mut out).unwrap();
            record.write_to(&mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[0].split(',').count(), lines[1].split(',').count());
            assert!(lines[1].starts_with("1.500,GWR Vans/van.wag,automatic_vacuum,apply,"));
            assert!(lines[1].contains(",,"), "missing reservoir leaves an empty column");
        }

        #[test]
        fn ids_with_commas_are_quoted() {
            assert_eq!(quote("a,b"), "\"a,b\"");
            assert_eq!(quote("say \"hi\","), "\"say \"\"hi\"\",\"");
            assert_eq!(quote("plain"), "plain");
        }
    }
}

pub mod summary {
    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use std::fs::{self, File};
    use std::io;
    use std::path::{Path, PathBuf};

    /// Train-level sample recorded every tick.
    #[derive(Debug, Clone, Serialize)]
    pub struct Sample {
        pub time_s: f64,
        pub lead_pipe_psi: f64,
        pub total_retard_force_n: f64,
        pub total_brake_force_n: f64,
    }

    /// Final and peak values of one car.
    #[derive(Debug, Clone, Serialize)]
    pub struct CarSummary {
        pub id: String,
        pub system: String,
        pub final_pipe_psi: f64,
        pub final_cylinder_psi: f64,
        pub final_retard_force_n: f64,
        pub peak_retard_force_n: f64,
        pub status: Vec<String>,
    }

    /// Envelope of a brake simulation run.
    #[derive(Debug, Serialize)]
    pub struct RunSummary {
        pub duration_s: f64,
        pub tick_s: f64,
        pub ticks: usize,
        pub peak_total_retard_force_n: f64,
        pub cars: Vec<CarSummary>,
        pub samples: Vec<Sample>,
    }

    /// Metadata describing the run.
    #[derive(Debug)]
    pub struct Metadata<'a> {
        pub scenario: &'a str,
        pub consist: &'a str,
        pub lead: Option<&'a str>,
        pub seed: u64,
    }

    #[derive(Serialize)]
    struct SummarySidecar<'a> {
        scenario: &'a str,
        consist: &'a str,
        lead: Option<&'a str>,
        seed: u64,
        duration_s: f64,
        tick_s: f64,
        ticks: usize,
        peak_total_retard_force_n: f64,
        cars: &'a [CarSummary],
        samples: &'a [Sample],
    }

    #[derive(Serialize)]
    struct PerSecondSidecar<'a> {
        scenario: &'a str,
        consist: &'a str,
        samples: Vec<SecondAggregate>,
    }

    #[derive(Debug, Serialize)]
    struct SecondAggregate {
        second: usize,
        time_s: f64,
        lead_pipe_psi: f64,
        total_retard_force_n: f64,
        total_brake_force_n: f64,
    }

    /// Write the JSON summary next to `output`, plus a per-second digest for runs of a minute
    /// or more. Returns the paths written.
    pub fn write_sidecars(
        output: &Path,
        meta: &Metadata<'_>,
        summary: &RunSummary,
    ) -> io::Result<Vec<PathBuf>> {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("brake_run");

        let summary_path = parent.join(format!("{}_summary.json", stem));
        let per_second_path = parent.join(format!("{}_per_second.json", stem));

        let sidecar = SummarySidecar {
            scenario: meta.scenario,
            consist: meta.consist,
            lead: meta.lead,
            seed: meta.seed,
            duration_s: summary.duration_s,
            tick_s: summary.tick_s,
            ticks: summary.ticks,
            peak_total_retard_force_n: summary.peak_total_retard_force_n,
            cars: &summary.cars,
            samples: &summary.samples,
        };
        to_writer_pretty(File::create(&summary_path)?, &sidecar)?;
        let mut written = vec![summary_path];

        if summary.duration_s >= 60.0 {
            let per_second = PerSecondSidecar {
                scenario: meta.scenario,
                consist: meta.consist,
                samples: aggregate_per_second(&summary.samples),
            };
            to_writer_pretty(File::create(&per_second_path)?, &per_second)?;
            written.push(per_second_path);
        }

        Ok(written)
    }

    /// Keep the last sample of every whole second.
    fn aggregate_per_second(samples: &[Sample]) -> Vec<SecondAggregate> {
        let mut seconds: Vec<SecondAggregate> = Vec::new();
        for sample in samples {
            let second = sample.time_s.max(0.0).floor() as usize;
            match seconds.last_mut() {
                Some(last) if last.second == second => {
                    last.time_s = sample.time_s;
                    last.lead_pipe_psi = sample.lead_pipe_psi;
                    last.total_retard_force_n = sample.total_retard_force_n;
                    last.total_brake_force_n = sample.total_brake_force_n;
                }
                _ => seconds.push(SecondAggregate {
                    second,
                    time_s: sample.time_s,
                    lead_pipe_psi: sample.lead_pipe_psi,
                    total_retard_force_n: sample.total_retard_force_n,
                    total_brake_force_n: sample.total_brake_force_n,
                }),
            }
        }
        seconds
    }

}
