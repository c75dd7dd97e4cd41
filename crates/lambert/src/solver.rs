//! Secant iteration on the universal variable for batches of transfer
//! problems.
//!
//! Every element runs the same state machine: `seeded → iterating →
//! {converged | exhausted | degenerate}`. Elements are independent, so the
//! batch front end fans them out across worker threads; results depend only
//! on the element index, never on thread count.

use astrochop_core::broadcast;
use astrochop_core::vector::{self, NO_SOLUTION, Vector3};
use rayon::prelude::*;
use thiserror::Error;

use crate::stumpff::term_ratio;

/// Swept-angle guard: `cos Δν` this close to ±1 leaves the problem without a
/// usable single-revolution geometry (±1 exactly means an undefined transfer
/// plane or a vanishing Lambert constant).
const COS_DNU_DEGENERATE: f64 = 1.0 - 1e-12;

/// Smallest secant denominator treated as a usable slope.
const MIN_SECANT_DENOM: f64 = 1e-300;

/// Transfer direction around the central body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Swept angle below 180°.
    ShortWay,
    /// Swept angle above 180°.
    LongWay,
}

impl TransferKind {
    /// Sign of the Lambert constant `A` for this branch.
    fn sign(self) -> f64 {
        match self {
            TransferKind::ShortWay => 1.0,
            TransferKind::LongWay => -1.0,
        }
    }
}

/// Tunable iteration parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Convergence threshold on the time-of-flight residual (seconds).
    pub tol_s: f64,
    /// Iteration budget per element.
    pub max_iter: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            tol_s: 1e-5,
            max_iter: 50,
        }
    }
}

/// Call-level input errors, rejected before any numeric work.
#[derive(Debug, Clone, Error)]
pub enum LambertError {
    #[error("time of flight must be positive (element {index}: {value} s)")]
    NonPositiveTimeOfFlight { index: usize, value: f64 },
    #[error("gravitational parameter must be positive, got {0} km^3/s^2")]
    NonPositiveMu(f64),
    #[error("batch lengths (r1: {r1}, r2: {r2}, dt: {dt}) do not broadcast; each must be 1 or a common N")]
    ShapeMismatch { r1: usize, r2: usize, dt: usize },
}

/// Terminal state of one batch element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferStatus {
    /// The residual dropped below tolerance after `iterations` secant steps.
    Converged { iterations: usize },
    /// Budget ran out; the velocities come from the best feasible iterate.
    Exhausted { residual_s: f64 },
    /// Degenerate geometry or no feasible universal variable was ever found;
    /// the velocities carry the no-solution marker.
    Degenerate,
}

impl TransferStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, TransferStatus::Converged { .. })
    }
}

/// Velocities of one connecting conic, plus how the element terminated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferResult {
    pub v1: Vector3,
    pub v2: Vector3,
    pub status: TransferStatus,
}

impl TransferResult {
    fn degenerate() -> Self {
        TransferResult {
            v1: NO_SOLUTION,
            v2: NO_SOLUTION,
            status: TransferStatus::Degenerate,
        }
    }
}

/// Batch output in the same element order as the broadcast inputs.
#[derive(Debug, Clone)]
pub struct BatchSolution {
    pub v1: Vec<Vector3>,
    pub v2: Vec<Vector3>,
    pub status: Vec<TransferStatus>,
}

impl BatchSolution {
    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }
}

/// Solve one Lambert problem.
///
/// This is the exact per-element path of [`solve`]; a size-one batch returns
/// bit-identical values.
pub fn solve_single(
    r1: &Vector3,
    r2: &Vector3,
    dt_s: f64,
    mu_km3_s2: f64,
    kind: TransferKind,
    options: &SolverOptions,
) -> TransferResult {
    let r1_mag = vector::norm(r1);
    let r2_mag = vector::norm(r2);
    let cos_dnu = (vector::dot(r1, r2) / (r1_mag * r2_mag)).clamp(-1.0, 1.0);

    // Zero swept angle leaves the transfer plane undefined; antipodal
    // geometry drives A -> 0 and the residual goes flat. Both terminate
    // here, before any iteration.
    if !(-COS_DNU_DEGENERATE..=COS_DNU_DEGENERATE).contains(&cos_dnu) {
        return TransferResult::degenerate();
    }

    let a_lambert = kind.sign() * (r1_mag * r2_mag * (1.0 + cos_dnu)).sqrt();
    let inv_sqrt_mu = 1.0 / mu_km3_s2.sqrt();

    // Time-of-flight residual T(z). NaN encodes the infeasible region
    // y <= 0, where the conic does not exist.
    let residual = |z: f64| -> f64 {
        let (term, ratio) = term_ratio(z);
        let y = r1_mag + r2_mag + a_lambert * term;
        if y <= 0.0 {
            return f64::NAN;
        }
        y.sqrt() * (y * ratio + a_lambert) * inv_sqrt_mu - dt_s
    };

    let mut z_prev = 0.0_f64;
    let mut z = 1.0_f64;
    let mut t_prev = residual(z_prev);
    let mut t_curr = residual(z);

    let mut last_feasible = if t_curr.is_finite() {
        Some(z)
    } else if t_prev.is_finite() {
        Some(z_prev)
    } else {
        None
    };
    let mut converged = t_curr.is_finite() && t_curr.abs() < options.tol_s;
    let mut iterations = 0;

    while iterations < options.max_iter && !converged {
        iterations += 1;

        if !t_curr.is_finite() {
            // Recovery: half-step back toward the last feasible iterate
            // instead of leaving the element on a divergent guess.
            let Some(anchor) = last_feasible else { break };
            z = 0.5 * (z + anchor);
            t_curr = residual(z);
            if t_curr.is_finite() {
                last_feasible = Some(z);
                converged = t_curr.abs() < options.tol_s;
            }
            continue;
        }

        let denom = t_curr - t_prev;
        if denom.abs() < MIN_SECANT_DENOM {
            break;
        }
        let z_next = z - t_curr * (z - z_prev) / denom;
        z_prev = z;
        t_prev = t_curr;
        z = z_next;
        t_curr = residual(z);
        if t_curr.is_finite() {
            last_feasible = Some(z);
            converged = t_curr.abs() < options.tol_s;
        }
    }

    // Best available iterate: the current z if feasible, otherwise the last
    // feasible one. An element that never found a feasible residual has no
    // conic to report.
    let (z_final, t_final) = if t_curr.is_finite() {
        (z, t_curr)
    } else {
        match last_feasible {
            Some(anchor) => (anchor, residual(anchor)),
            None => return TransferResult::degenerate(),
        }
    };

    let (term, _) = term_ratio(z_final);
    let y = r1_mag + r2_mag + a_lambert * term;
    if y <= 0.0 {
        return TransferResult::degenerate();
    }

    let f = 1.0 - y / r1_mag;
    let g = a_lambert * (y / mu_km3_s2).sqrt();
    let g_dot = 1.0 - y / r2_mag;

    let v1 = vector::scale(&vector::sub(r2, &vector::scale(r1, f)), 1.0 / g);
    let v2 = vector::scale(&vector::sub(&vector::scale(r2, g_dot), r1), 1.0 / g);

    let status = if converged {
        TransferStatus::Converged { iterations }
    } else {
        TransferStatus::Exhausted {
            residual_s: t_final,
        }
    };
    TransferResult { v1, v2, status }
}

/// Solve a batch of Lambert problems.
///
/// `r1`, `r2`, and `dt_s` broadcast against each other: each may hold either
/// one entry shared by the whole batch or one entry per element. Input
/// validation is call-level; per-element failures surface through
/// [`TransferStatus`] and the NaN marker, so one bad cell never aborts the
/// batch.
pub fn solve(
    r1: &[Vector3],
    r2: &[Vector3],
    dt_s: &[f64],
    mu_km3_s2: f64,
    kind: TransferKind,
    options: &SolverOptions,
) -> Result<BatchSolution, LambertError> {
    if mu_km3_s2 <= 0.0 {
        return Err(LambertError::NonPositiveMu(mu_km3_s2));
    }
    let n = broadcast::common_len(&[r1.len(), r2.len(), dt_s.len()]).ok_or(
        LambertError::ShapeMismatch {
            r1: r1.len(),
            r2: r2.len(),
            dt: dt_s.len(),
        },
    )?;
    for (index, &value) in dt_s.iter().enumerate() {
        if !(value > 0.0) {
            return Err(LambertError::NonPositiveTimeOfFlight { index, value });
        }
    }

    let results: Vec<TransferResult> = (0..n)
        .into_par_iter()
        .map(|i| {
            solve_single(
                &broadcast::pick(r1, i),
                &broadcast::pick(r2, i),
                broadcast::pick(dt_s, i),
                mu_km3_s2,
                kind,
                options,
            )
        })
        .collect();

    let mut solution = BatchSolution {
        v1: Vec::with_capacity(n),
        v2: Vec::with_capacity(n),
        status: Vec::with_capacity(n),
    };
    for result in results {
        solution.v1.push(result.v1);
        solution.v2.push(result.v2);
        solution.status.push(result.status);
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const MU: f64 = 1e11;
    const R: f64 = 1e8;

    fn quarter_circle() -> (Vector3, Vector3, f64) {
        let dt = (PI / 2.0) * (R * R * R / MU).sqrt();
        ([R, 0.0, 0.0], [0.0, R, 0.0], dt)
    }

    #[test]
    fn circular_quarter_transfer_recovers_circular_velocity() {
        let (r1, r2, dt) = quarter_circle();
        let result = solve_single(&r1, &r2, dt, MU, TransferKind::ShortWay, &SolverOptions::default());
        assert!(result.status.is_converged(), "{:?}", result.status);

        let v_circ = (MU / R).sqrt();
        assert!((result.v1[0]).abs() < 1e-3);
        assert!((result.v1[1] - v_circ).abs() < 1e-3);
        assert!((result.v1[2]).abs() < 1e-3);
        assert!((result.v2[0] + v_circ).abs() < 1e-3);
        assert!((result.v2[1]).abs() < 1e-3);
        assert!((result.v2[2]).abs() < 1e-3);
    }

    #[test]
    fn batch_matches_scalar_bit_for_bit() {
        let (r1, r2, dt) = quarter_circle();
        let r2_alt = [-R * 0.3, R * 0.9, R * 0.01];
        let batch = solve(
            &[r1],
            &[r2, r2_alt],
            &[dt, dt * 1.4],
            MU,
            TransferKind::ShortWay,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(batch.len(), 2);

        let opts = SolverOptions::default();
        for (i, &r2_i) in [r2, r2_alt].iter().enumerate() {
            let dt_i = [dt, dt * 1.4][i];
            let single = solve_single(&r1, &r2_i, dt_i, MU, TransferKind::ShortWay, &opts);
            assert_eq!(batch.v1[i], single.v1);
            assert_eq!(batch.v2[i], single.v2);
            assert_eq!(batch.status[i], single.status);
        }
    }

    #[test]
    fn zero_swept_angle_is_degenerate_not_a_crash() {
        let r = [R, 0.0, 0.0];
        let result = solve_single(&r, &r, 1e6, MU, TransferKind::ShortWay, &SolverOptions::default());
        assert_eq!(result.status, TransferStatus::Degenerate);
        assert!(vector::is_no_solution(&result.v1));
        assert!(vector::is_no_solution(&result.v2));
    }

    #[test]
    fn antipodal_geometry_is_degenerate() {
        let r1 = [R, 0.0, 0.0];
        let r2 = [-R, 0.0, 0.0];
        let result = solve_single(&r1, &r2, 1e6, MU, TransferKind::ShortWay, &SolverOptions::default());
        assert_eq!(result.status, TransferStatus::Degenerate);
    }

    #[test]
    fn zero_iteration_budget_returns_seed_values() {
        let (r1, r2, dt) = quarter_circle();
        let options = SolverOptions {
            tol_s: 1e-5,
            max_iter: 0,
        };
        let result = solve_single(&r1, &r2, dt, MU, TransferKind::ShortWay, &options);
        // No iterations happened, so the element reports the z = 1 seed.
        match result.status {
            TransferStatus::Exhausted { residual_s } => assert!(residual_s.is_finite()),
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert!(result.v1.iter().all(|c| c.is_finite()));
        assert!(result.v2.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn rejects_non_positive_time_of_flight() {
        let (r1, r2, dt) = quarter_circle();
        let err = solve(
            &[r1],
            &[r2],
            &[dt, -1.0],
            MU,
            TransferKind::ShortWay,
            &SolverOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LambertError::NonPositiveTimeOfFlight { index: 1, .. }
        ));
    }

    #[test]
    fn rejects_non_positive_mu() {
        let (r1, r2, dt) = quarter_circle();
        let err = solve(&[r1], &[r2], &[dt], 0.0, TransferKind::ShortWay, &SolverOptions::default())
            .unwrap_err();
        assert!(matches!(err, LambertError::NonPositiveMu(_)));
    }

    #[test]
    fn rejects_mismatched_batch_lengths() {
        let (r1, r2, dt) = quarter_circle();
        let err = solve(
            &[r1, r1],
            &[r2, r2, r2],
            &[dt],
            MU,
            TransferKind::ShortWay,
            &SolverOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LambertError::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_empty_batch() {
        let err = solve(&[], &[], &[], MU, TransferKind::ShortWay, &SolverOptions::default())
            .unwrap_err();
        assert!(matches!(err, LambertError::ShapeMismatch { .. }));
    }

    #[test]
    fn non_finite_positions_terminate_degenerate() {
        let r1 = [f64::NAN, 0.0, 0.0];
        let r2 = [0.0, R, 0.0];
        let result = solve_single(&r1, &r2, 1e6, MU, TransferKind::ShortWay, &SolverOptions::default());
        assert_eq!(result.status, TransferStatus::Degenerate);
    }
}
