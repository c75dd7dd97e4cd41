//! Export helpers for CSV and JSON artifacts.

pub mod porkchop {
    use std::fs::{self, File};
    use std::io::{self, BufWriter, Write};
    use std::path::Path;

    pub const HEADER: &str =
        "launch_jd,arrival_jd,launch_date,arrival_date,tof_days,c3_km2_s2,vinf_arr_km_s,converged";

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

    /// Write the standard porkchop CSV header.
    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// CSV row emitted by the porkchop exporter, one per grid cell.
    #[derive(Debug, Clone)]
    pub struct Record<'a> {
        pub launch_jd: f64,
        pub arrival_jd: f64,
        pub launch_date: &'a str,
        pub arrival_date: &'a str,
        pub tof_days: f64,
        pub c3_km2_s2: f64,
        pub vinf_arr_km_s: f64,
        pub converged: bool,
    }

    impl<'a> Record<'a> {
        /// Serialize the record to CSV, matching the standard header ordering.
        pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
            writeln!(
                writer,
                "{},{},{},{},{:.4},{:.6},{:.6},{}",
                self.launch_jd,
                self.arrival_jd,
                self.launch_date,
                self.arrival_date,
                self.tof_days,
                self.c3_km2_s2,
                self.vinf_arr_km_s,
                if self.converged { "true" } else { "false" },
            )
        }
    }
}

pub mod summary {
    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use std::fs::{self, File};
    use std::io;
    use std::path::Path;

    /// Optimal cell reported in the run summary.
    #[derive(Debug, Clone, Serialize)]
    pub struct OptimalCell {
        pub launch_jd: f64,
        pub arrival_jd: f64,
        pub launch_date: String,
        pub arrival_date: String,
        pub tof_days: f64,
        pub c3_km2_s2: f64,
        pub vinf_arr_km_s: f64,
    }

    /// Envelope describing one porkchop sweep.
    #[derive(Debug, Serialize)]
    pub struct RunSummary {
        pub departure_body: String,
        pub arrival_body: String,
        pub launch_epochs: usize,
        pub arrival_epochs: usize,
        pub cells: usize,
        pub converged_cells: usize,
        pub min_c3: Option<OptimalCell>,
    }

    /// Write the summary as pretty JSON, creating parent directories.
    pub fn write_json(path: &Path, summary: &RunSummary) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        to_writer_pretty(file, summary).map_err(io::Error::from)
    }
}
