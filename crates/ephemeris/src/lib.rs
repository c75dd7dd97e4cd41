//! Analytic Keplerian ephemerides for the built-in body catalog.
//!
//! Each supported body carries one immutable set of J2000 mean elements;
//! propagation is pure two-body motion around the Sun. Good to a fraction of
//! a degree over a few decades around J2000, which is what a porkchop sweep
//! needs; this is not an almanac.

use std::fmt;
use std::str::FromStr;

use astrochop_core::constants::{AU_KM, J2000_JD, MU_SUN_KM3_S2};
use astrochop_core::vector::Vector3;
use thiserror::Error;

pub mod kepler;

pub use kepler::KeplerSolver;

/// Raised when a body name does not match the catalog.
#[derive(Debug, Clone, Error)]
#[error("unknown body `{0}` (supported: earth, mars)")]
pub struct UnknownBodyError(pub String);

/// Mean Keplerian elements at J2000.0. Angles are stored in degrees and the
/// mean motion in degrees/day, matching the source catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalElements {
    pub semi_major_axis_au: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub ascending_node_deg: f64,
    pub arg_periapsis_deg: f64,
    pub mean_anomaly_j2000_deg: f64,
    pub mean_motion_deg_day: f64,
}

const EARTH_ELEMENTS: OrbitalElements = OrbitalElements {
    semi_major_axis_au: 1.000_000_11,
    eccentricity: 0.016_710_22,
    inclination_deg: 0.000_05,
    ascending_node_deg: -11.260_64,
    arg_periapsis_deg: 102.947_19,
    // Folded from the J2000 mean longitude L = M + ω + Ω, L = 100.46435°.
    mean_anomaly_j2000_deg: 100.464_35 - 102.947_19 - (-11.260_64),
    mean_motion_deg_day: 0.985_609,
};

const MARS_ELEMENTS: OrbitalElements = OrbitalElements {
    semi_major_axis_au: 1.523_662_31,
    eccentricity: 0.093_412_33,
    inclination_deg: 1.850_61,
    ascending_node_deg: 49.578_54,
    // Folded from the J2000 longitude of perihelion ϖ = ω + Ω, ϖ = 336.04084°.
    arg_periapsis_deg: 336.040_84 - 49.578_54,
    mean_anomaly_j2000_deg: 19.412,
    mean_motion_deg_day: 0.524_039,
};

/// Bodies in the built-in catalog.
///
/// The catalog is a small closed set, so lookup is an enum match rather than
/// a string-keyed map; the string entry points return [`UnknownBodyError`]
/// for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Body {
    Earth,
    Mars,
}

impl Body {
    pub const ALL: [Body; 2] = [Body::Earth, Body::Mars];

    /// Canonical lowercase name, as accepted by the string entry points.
    pub fn name(self) -> &'static str {
        match self {
            Body::Earth => "earth",
            Body::Mars => "mars",
        }
    }

    /// The body's J2000 mean elements.
    pub fn elements(self) -> &'static OrbitalElements {
        match self {
            Body::Earth => &EARTH_ELEMENTS,
            Body::Mars => &MARS_ELEMENTS,
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Body {
    type Err = UnknownBodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Body::ALL
            .into_iter()
            .find(|body| s.eq_ignore_ascii_case(body.name()))
            .ok_or_else(|| UnknownBodyError(s.to_string()))
    }
}

/// Heliocentric position and velocity of one body at one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position_km: Vector3,
    pub velocity_km_s: Vector3,
}

type Matrix3 = [[f64; 3]; 3];

fn rot_z(angle_rad: f64) -> Matrix3 {
    let (s, c) = angle_rad.sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

fn rot_x(angle_rad: f64) -> Matrix3 {
    let (s, c) = angle_rad.sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

fn mat_mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (row, out_row) in out.iter_mut().enumerate() {
        for (col, cell) in out_row.iter_mut().enumerate() {
            *cell = a[row][0] * b[0][col] + a[row][1] * b[1][col] + a[row][2] * b[2][col];
        }
    }
    out
}

fn mat_apply(m: &Matrix3, v: &Vector3) -> Vector3 {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Perifocal → heliocentric-inertial rotation `R_z(Ω)·R_x(i)·R_z(ω)`.
fn perifocal_to_inertial(elements: &OrbitalElements) -> Matrix3 {
    let node = rot_z(elements.ascending_node_deg.to_radians());
    let incl = rot_x(elements.inclination_deg.to_radians());
    let peri = rot_z(elements.arg_periapsis_deg.to_radians());
    mat_mul(&node, &mat_mul(&incl, &peri))
}

/// Propagate a catalog body to a Julian Date with the default Kepler solver.
pub fn propagate(body: Body, jd: f64) -> StateVector {
    propagate_with(body, jd, &KeplerSolver::default())
}

/// Propagate with an explicit Kepler solution strategy.
pub fn propagate_with(body: Body, jd: f64, solver: &KeplerSolver) -> StateVector {
    let elements = body.elements();
    let days = jd - J2000_JD;

    let mean_anomaly =
        (elements.mean_anomaly_j2000_deg + elements.mean_motion_deg_day * days).to_radians();
    let e = elements.eccentricity;
    let ecc_anomaly = kepler::eccentric_anomaly(mean_anomaly, e, solver);

    let a = elements.semi_major_axis_au * AU_KM;
    let (sin_e, cos_e) = ecc_anomaly.sin_cos();
    let one_minus_e2_sqrt = (1.0 - e * e).sqrt();

    let r_mag = a * (1.0 - e * cos_e);
    let perifocal_pos = [a * (cos_e - e), a * one_minus_e2_sqrt * sin_e, 0.0];

    let v_factor = (MU_SUN_KM3_S2 * a).sqrt() / r_mag;
    let perifocal_vel = [
        -v_factor * sin_e,
        v_factor * one_minus_e2_sqrt * cos_e,
        0.0,
    ];

    let rotation = perifocal_to_inertial(elements);
    StateVector {
        position_km: mat_apply(&rotation, &perifocal_pos),
        velocity_km_s: mat_apply(&rotation, &perifocal_vel),
    }
}

/// Propagate a catalog body to every epoch in `jds`.
///
/// Element `k` of the result is exactly `propagate(body, jds[k])`: the batch
/// form maps the scalar path per element, so batched and scalar calls cannot
/// drift apart.
pub fn propagate_batch(body: Body, jds: &[f64]) -> Vec<StateVector> {
    jds.iter().map(|&jd| propagate(body, jd)).collect()
}

/// String entry point: resolve `name` against the catalog, then propagate.
pub fn state_vector(name: &str, jd: f64) -> Result<StateVector, UnknownBodyError> {
    Ok(propagate(name.parse()?, jd))
}

/// Batch string entry point. An unknown name fails the whole call; there is
/// no partial result.
pub fn state_vectors(name: &str, jds: &[f64]) -> Result<Vec<StateVector>, UnknownBodyError> {
    Ok(propagate_batch(name.parse()?, jds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrochop_core::vector;

    #[test]
    fn body_names_round_trip() {
        for body in Body::ALL {
            assert_eq!(body.name().parse::<Body>().unwrap(), body);
        }
        assert_eq!("EARTH".parse::<Body>().unwrap(), Body::Earth);
        assert_eq!("Mars".parse::<Body>().unwrap(), Body::Mars);
    }

    #[test]
    fn unknown_body_is_a_hard_error() {
        let err = "ceres".parse::<Body>().unwrap_err();
        assert!(err.to_string().contains("ceres"));
        assert!(state_vector("ceres", J2000_JD).is_err());
        assert!(state_vectors("ceres", &[J2000_JD]).is_err());
    }

    #[test]
    fn earth_at_j2000_matches_reference_state() {
        // Reference values evaluated from the same catalog elements.
        let state = propagate(Body::Earth, J2000_JD);
        let expected_pos = [-27_475_048.815_934_945, 144_540_212.448_280_96, 119.024_956_8];
        for axis in 0..3 {
            assert!(
                (state.position_km[axis] - expected_pos[axis]).abs() < 1.0,
                "axis {axis}: {} vs {}",
                state.position_km[axis],
                expected_pos[axis]
            );
        }
        let speed = vector::norm(&state.velocity_km_s);
        assert!((speed - 30.280_497).abs() < 1e-3, "speed {speed}");
    }

    #[test]
    fn orbit_radii_stay_within_catalog_bounds() {
        for k in 0..400 {
            let jd = J2000_JD + 10.0 * k as f64;
            let earth = propagate(Body::Earth, jd);
            let r_earth = vector::norm(&earth.position_km) / AU_KM;
            assert!((0.975..=1.025).contains(&r_earth), "jd {jd}: {r_earth}");

            let mars = propagate(Body::Mars, jd);
            let r_mars = vector::norm(&mars.position_km) / AU_KM;
            assert!((1.35..=1.70).contains(&r_mars), "jd {jd}: {r_mars}");
        }
    }

    #[test]
    fn velocity_matches_finite_difference_of_position() {
        let dt_days = 1e-3;
        for &body in &[Body::Earth, Body::Mars] {
            let jd = J2000_JD + 321.0;
            let before = propagate(body, jd - dt_days);
            let after = propagate(body, jd + dt_days);
            let state = propagate(body, jd);
            for axis in 0..3 {
                let numeric = (after.position_km[axis] - before.position_km[axis])
                    / (2.0 * dt_days * 86_400.0);
                assert!(
                    (numeric - state.velocity_km_s[axis]).abs() < 1e-4,
                    "{body} axis {axis}: {numeric} vs {}",
                    state.velocity_km_s[axis]
                );
            }
        }
    }

    #[test]
    fn batch_equals_scalar_elementwise() {
        let jds: Vec<f64> = (0..64).map(|k| J2000_JD + 17.25 * k as f64).collect();
        for body in Body::ALL {
            let batch = propagate_batch(body, &jds);
            assert_eq!(batch.len(), jds.len());
            for (state, &jd) in batch.iter().zip(&jds) {
                assert_eq!(*state, propagate(body, jd));
            }
        }
    }

    #[test]
    fn newton_solver_tracks_the_legacy_default() {
        let newton = KeplerSolver::Newton {
            tolerance: 1e-14,
            max_iterations: 20,
        };
        let jd = J2000_JD + 777.5;
        for body in Body::ALL {
            let legacy = propagate(body, jd);
            let upgraded = propagate_with(body, jd, &newton);
            let dr = vector::norm(&vector::sub(
                &legacy.position_km,
                &upgraded.position_km,
            ));
            assert!(dr < 1e-2, "{body}: {dr} km");
        }
    }
}
