//! Batch Lambert solver in the universal-variable formulation.
//!
//! Given a departure position, an arrival position, and a time of flight,
//! Lambert's problem asks for the conic arc connecting them around a central
//! body. This crate solves the single-revolution problem for whole batches
//! at once: the shape of the computation behind a porkchop plot, where every
//! grid cell is one (departure epoch, arrival epoch) pair.
//!
//! The free parameter is the universal variable `z` (z > 0 elliptic, z = 0
//! parabolic, z < 0 hyperbolic). The time-of-flight residual is driven to
//! zero per element by a secant iteration over the auxiliary functions in
//! [`stumpff`]; feasibility (`y > 0`) is checked at every evaluation and
//! unsolvable elements surface as an explicit no-solution marker rather than
//! an error or a silently wrong vector.

pub mod solver;
pub mod stumpff;

pub use solver::{
    BatchSolution, LambertError, SolverOptions, TransferKind, TransferResult, TransferStatus,
    solve, solve_single,
};
