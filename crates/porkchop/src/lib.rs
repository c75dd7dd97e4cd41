//! Launch-window grid generation on top of the ephemeris and Lambert crates.
//!
//! A porkchop sweep pairs every departure epoch with every arrival epoch,
//! solves the connecting transfer for each cell, and reports the energy
//! metrics mission design cares about: departure C3 and arrival v∞ against
//! the time-of-flight surface. Cells without a meaningful transfer (arrival
//! before departure, degenerate geometry, non-converged iteration) carry NaN
//! and a cleared validity flag; they never abort the sweep.

use astrochop_core::constants::MU_SUN_KM3_S2;
use astrochop_core::time::days_to_seconds;
use astrochop_core::vector::{self, Vector3};
use astrochop_ephemeris::{Body, StateVector, propagate_batch};
use astrochop_lambert::{self as lambert, SolverOptions, TransferKind};
use thiserror::Error;

/// Placeholder Δt fed to the whole-grid solver call for cells where arrival
/// precedes departure; their outputs are masked afterwards.
const PLACEHOLDER_DT_S: f64 = 1.0;

/// Half-open sweep of Julian Dates, `start_jd` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochWindow {
    pub start_jd: f64,
    pub end_jd: f64,
    pub step_days: f64,
}

impl EpochWindow {
    /// Materialize the epochs of this window.
    pub fn epochs(&self) -> Vec<f64> {
        let mut out = Vec::new();
        if self.step_days > 0.0 {
            let mut jd = self.start_jd;
            while jd < self.end_jd {
                out.push(jd);
                jd = self.start_jd + self.step_days * (out.len() as f64);
            }
        }
        out
    }
}

/// One full sweep request.
#[derive(Debug, Clone)]
pub struct PorkchopRequest {
    pub departure_body: Body,
    pub arrival_body: Body,
    pub departure: EpochWindow,
    pub arrival: EpochWindow,
    pub mu_km3_s2: f64,
    pub transfer: TransferKind,
    pub solver: SolverOptions,
}

impl PorkchopRequest {
    /// Heliocentric short-way sweep with default solver settings.
    pub fn new(
        departure_body: Body,
        arrival_body: Body,
        departure: EpochWindow,
        arrival: EpochWindow,
    ) -> Self {
        PorkchopRequest {
            departure_body,
            arrival_body,
            departure,
            arrival,
            mu_km3_s2: MU_SUN_KM3_S2,
            transfer: TransferKind::ShortWay,
            solver: SolverOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PorkchopError {
    #[error("{axis} window has non-positive step ({step_days} days)")]
    NonPositiveStep { axis: &'static str, step_days: f64 },
    #[error("{axis} window {start_jd}..{end_jd} contains no epochs")]
    EmptyWindow {
        axis: &'static str,
        start_jd: f64,
        end_jd: f64,
    },
    #[error(transparent)]
    Lambert(#[from] lambert::LambertError),
}

/// Dense (arrival × launch) grid in row-major order, arrival varying along
/// rows. Scalar surfaces carry NaN wherever `converged` is false.
#[derive(Debug, Clone)]
pub struct PorkchopGrid {
    pub launch_jd: Vec<f64>,
    pub arrival_jd: Vec<f64>,
    pub tof_days: Vec<f64>,
    pub c3_km2_s2: Vec<f64>,
    pub vinf_arrive_km_s: Vec<f64>,
    pub converged: Vec<bool>,
}

/// One grid cell, as returned by [`PorkchopGrid::min_c3_cell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub launch_idx: usize,
    pub arrival_idx: usize,
    pub launch_jd: f64,
    pub arrival_jd: f64,
    pub tof_days: f64,
    pub c3_km2_s2: f64,
    pub vinf_arrive_km_s: f64,
}

impl PorkchopGrid {
    pub fn width(&self) -> usize {
        self.launch_jd.len()
    }

    pub fn height(&self) -> usize {
        self.arrival_jd.len()
    }

    /// Flat index of (arrival row, launch column).
    #[inline]
    pub fn index(&self, arrival_idx: usize, launch_idx: usize) -> usize {
        arrival_idx * self.width() + launch_idx
    }

    /// Cell view at (arrival row, launch column).
    pub fn cell(&self, arrival_idx: usize, launch_idx: usize) -> GridCell {
        let i = self.index(arrival_idx, launch_idx);
        GridCell {
            launch_idx,
            arrival_idx,
            launch_jd: self.launch_jd[launch_idx],
            arrival_jd: self.arrival_jd[arrival_idx],
            tof_days: self.tof_days[i],
            c3_km2_s2: self.c3_km2_s2[i],
            vinf_arrive_km_s: self.vinf_arrive_km_s[i],
        }
    }

    /// The converged cell with the lowest departure C3, if any converged.
    pub fn min_c3_cell(&self) -> Option<GridCell> {
        let mut best: Option<GridCell> = None;
        for arrival_idx in 0..self.height() {
            for launch_idx in 0..self.width() {
                let cell = self.cell(arrival_idx, launch_idx);
                if !cell.c3_km2_s2.is_finite() {
                    continue;
                }
                if best
                    .as_ref()
                    .is_none_or(|b| cell.c3_km2_s2 < b.c3_km2_s2)
                {
                    best = Some(cell);
                }
            }
        }
        best
    }
}

fn window_epochs(
    window: &EpochWindow,
    axis: &'static str,
) -> Result<Vec<f64>, PorkchopError> {
    if window.step_days <= 0.0 {
        return Err(PorkchopError::NonPositiveStep {
            axis,
            step_days: window.step_days,
        });
    }
    let epochs = window.epochs();
    if epochs.is_empty() {
        return Err(PorkchopError::EmptyWindow {
            axis,
            start_jd: window.start_jd,
            end_jd: window.end_jd,
        });
    }
    Ok(epochs)
}

/// Run the sweep: ephemerides once per axis, one Lambert call over the whole
/// grid, then the energy metrics per cell.
pub fn generate(request: &PorkchopRequest) -> Result<PorkchopGrid, PorkchopError> {
    let launch_jd = window_epochs(&request.departure, "departure")?;
    let arrival_jd = window_epochs(&request.arrival, "arrival")?;

    let departure_states = propagate_batch(request.departure_body, &launch_jd);
    let arrival_states = propagate_batch(request.arrival_body, &arrival_jd);

    let width = launch_jd.len();
    let height = arrival_jd.len();
    let cells = width * height;

    let mut r1 = Vec::with_capacity(cells);
    let mut r2 = Vec::with_capacity(cells);
    let mut dt_s = Vec::with_capacity(cells);
    let mut tof_days = Vec::with_capacity(cells);
    for arrival_idx in 0..height {
        for launch_idx in 0..width {
            r1.push(departure_states[launch_idx].position_km);
            r2.push(arrival_states[arrival_idx].position_km);
            let tof = arrival_jd[arrival_idx] - launch_jd[launch_idx];
            tof_days.push(tof);
            dt_s.push(if tof > 0.0 {
                days_to_seconds(tof)
            } else {
                PLACEHOLDER_DT_S
            });
        }
    }

    let solution = lambert::solve(
        &r1,
        &r2,
        &dt_s,
        request.mu_km3_s2,
        request.transfer,
        &request.solver,
    )?;

    let mut grid = PorkchopGrid {
        launch_jd,
        arrival_jd,
        tof_days: vec![f64::NAN; cells],
        c3_km2_s2: vec![f64::NAN; cells],
        vinf_arrive_km_s: vec![f64::NAN; cells],
        converged: vec![false; cells],
    };

    for i in 0..cells {
        let reachable = tof_days[i] > 0.0 && solution.status[i].is_converged();
        if !reachable {
            continue;
        }
        let departure_state: &StateVector = &departure_states[i % width];
        let arrival_state: &StateVector = &arrival_states[i / width];
        grid.tof_days[i] = tof_days[i];
        grid.c3_km2_s2[i] = departure_c3(&solution.v1[i], departure_state);
        grid.vinf_arrive_km_s[i] = arrival_vinf(&solution.v2[i], arrival_state);
        grid.converged[i] = true;
    }

    Ok(grid)
}

/// Departure characteristic energy: |v1 − v_body|² (km²/s²).
fn departure_c3(v1: &Vector3, body: &StateVector) -> f64 {
    let vinf = vector::sub(v1, &body.velocity_km_s);
    vector::dot(&vinf, &vinf)
}

/// Arrival hyperbolic excess speed: |v_body − v2| (km/s).
fn arrival_vinf(v2: &Vector3, body: &StateVector) -> f64 {
    vector::norm(&vector::sub(&body.velocity_km_s, v2))
}
