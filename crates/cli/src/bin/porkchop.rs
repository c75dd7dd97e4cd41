use std::io::Write as _;
use std::path::PathBuf;

use anyhow::anyhow;
use astrochop::core::time;
use astrochop::ephemeris::Body;
use astrochop::export::porkchop as export_porkchop;
use astrochop::export::summary::{OptimalCell, RunSummary};
use astrochop::lambert::{SolverOptions, TransferKind};
use astrochop::porkchop::{EpochWindow, PorkchopRequest, generate};
use chrono::{DateTime, NaiveDate};
use clap::Parser;

/// Generate porkchop data (CSV) by sweeping departure and arrival epochs.
#[derive(Parser, Debug)]
#[command(author, version, about = "Porkchop CSV generator (two-body ballistic)")]
struct Cli {
    /// Departure body name (case-insensitive)
    #[arg(long, default_value = "earth")]
    from: String,

    /// Arrival body name (case-insensitive)
    #[arg(long, default_value = "mars")]
    to: String,

    /// Departure window start date (UTC, YYYY-MM-DD)
    #[arg(long)]
    depart_start: NaiveDate,

    /// Departure window end date (exclusive)
    #[arg(long)]
    depart_end: NaiveDate,

    /// Arrival window start date
    #[arg(long)]
    arrive_start: NaiveDate,

    /// Arrival window end date (exclusive)
    #[arg(long)]
    arrive_end: NaiveDate,

    /// Grid step in days
    #[arg(long, default_value_t = 5.0)]
    step_days: f64,

    /// Solve the long-path (swept angle > 180°) branch instead of short-path
    #[arg(long, default_value_t = false)]
    long_path: bool,

    /// Lambert residual tolerance in seconds
    #[arg(long, default_value_t = 1e-5)]
    tol: f64,

    /// Lambert iteration budget per grid cell
    #[arg(long, default_value_t = 50)]
    max_iter: usize,

    /// Output CSV file (use '-' for stdout)
    #[arg(long, default_value = "artifacts/porkchop.csv")]
    output: PathBuf,

    /// Optional JSON run summary
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn jd_from_date(date: NaiveDate) -> f64 {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
    time::jd_from_unix_seconds(midnight.and_utc().timestamp() as f64)
}

fn date_label(jd: f64) -> String {
    let unix = time::unix_seconds_from_jd(jd);
    match DateTime::from_timestamp(unix.round() as i64, 0) {
        Some(stamp) => stamp.date_naive().format("%Y-%m-%d").to_string(),
        None => format!("{jd:.2}"),
    }
}

fn window(start: NaiveDate, end: NaiveDate, step_days: f64, axis: &str) -> anyhow::Result<EpochWindow> {
    if end <= start {
        return Err(anyhow!("{axis} window end must be after start"));
    }
    Ok(EpochWindow {
        start_jd: jd_from_date(start),
        end_jd: jd_from_date(end),
        step_days,
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let departure_body: Body = cli.from.parse()?;
    let arrival_body: Body = cli.to.parse()?;
    let step_days = cli.step_days.max(0.1);

    let mut request = PorkchopRequest::new(
        departure_body,
        arrival_body,
        window(cli.depart_start, cli.depart_end, step_days, "departure")?,
        window(cli.arrive_start, cli.arrive_end, step_days, "arrival")?,
    );
    if cli.long_path {
        request.transfer = TransferKind::LongWay;
    }
    request.solver = SolverOptions {
        tol_s: cli.tol,
        max_iter: cli.max_iter,
    };

    let grid = generate(&request)?;
    eprintln!(
        "Swept {} launch × {} arrival epochs for {} → {}",
        grid.width(),
        grid.height(),
        departure_body,
        arrival_body
    );

    let mut writer = export_porkchop::writer_for_path(&cli.output)?;
    export_porkchop::write_header(writer.as_mut())?;
    for arrival_idx in 0..grid.height() {
        for launch_idx in 0..grid.width() {
            let cell = grid.cell(arrival_idx, launch_idx);
            export_porkchop::Record {
                launch_jd: cell.launch_jd,
                arrival_jd: cell.arrival_jd,
                launch_date: &date_label(cell.launch_jd),
                arrival_date: &date_label(cell.arrival_jd),
                tof_days: cell.tof_days,
                c3_km2_s2: cell.c3_km2_s2,
                vinf_arr_km_s: cell.vinf_arrive_km_s,
                converged: grid.converged[grid.index(arrival_idx, launch_idx)],
            }
            .write_to(writer.as_mut())?;
        }
    }
    writer.flush()?;

    let converged_cells = grid.converged.iter().filter(|&&c| c).count();
    let best = grid.min_c3_cell();
    match &best {
        Some(cell) => eprintln!(
            "min C3 = {:.3} km²/s² (launch {}, arrive {}, TOF {:.0} d, arrival v∞ {:.3} km/s)",
            cell.c3_km2_s2,
            date_label(cell.launch_jd),
            date_label(cell.arrival_jd),
            cell.tof_days,
            cell.vinf_arrive_km_s
        ),
        None => eprintln!("no feasible transfers in the requested windows"),
    }

    if let Some(summary_path) = &cli.summary {
        let summary = RunSummary {
            departure_body: departure_body.to_string(),
            arrival_body: arrival_body.to_string(),
            launch_epochs: grid.width(),
            arrival_epochs: grid.height(),
            cells: grid.width() * grid.height(),
            converged_cells,
            min_c3: best.map(|cell| OptimalCell {
                launch_jd: cell.launch_jd,
                arrival_jd: cell.arrival_jd,
                launch_date: date_label(cell.launch_jd),
                arrival_date: date_label(cell.arrival_jd),
                tof_days: cell.tof_days,
                c3_km2_s2: cell.c3_km2_s2,
                vinf_arr_km_s: cell.vinf_arrive_km_s,
            }),
        };
        astrochop::export::summary::write_json(summary_path, &summary)?;
    }

    Ok(())
}
