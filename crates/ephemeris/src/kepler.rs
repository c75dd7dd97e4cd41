//! Kepler's equation `M = E − e·sin E`.

/// Strategy for recovering eccentric anomaly from mean anomaly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeplerSolver {
    /// Fixed-count Picard iteration `E ← M + e·sin E` seeded at `E = M`.
    ///
    /// No convergence check: the cost is deterministic, and for the catalog
    /// eccentricities (e < 0.1) ten rounds land far below the f64 error
    /// floor.
    FixedPoint { iterations: u32 },
    /// Newton iteration with an explicit step tolerance (radians).
    Newton { tolerance: f64, max_iterations: u32 },
}

impl Default for KeplerSolver {
    fn default() -> Self {
        KeplerSolver::FixedPoint { iterations: 10 }
    }
}

/// Solve Kepler's equation for eccentric anomaly (radians).
pub fn eccentric_anomaly(mean_anomaly_rad: f64, eccentricity: f64, solver: &KeplerSolver) -> f64 {
    match *solver {
        KeplerSolver::FixedPoint { iterations } => {
            let mut e_anom = mean_anomaly_rad;
            for _ in 0..iterations {
                e_anom = mean_anomaly_rad + eccentricity * e_anom.sin();
            }
            e_anom
        }
        KeplerSolver::Newton {
            tolerance,
            max_iterations,
        } => {
            let mut e_anom = mean_anomaly_rad;
            for _ in 0..max_iterations {
                let residual = e_anom - eccentricity * e_anom.sin() - mean_anomaly_rad;
                let slope = 1.0 - eccentricity * e_anom.cos();
                let step = residual / slope;
                e_anom -= step;
                if step.abs() < tolerance {
                    break;
                }
            }
            e_anom
        }
    }
}
