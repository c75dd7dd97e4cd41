//! Porkchop-plot core: analytic ephemerides, a batch universal-variable
//! Lambert solver, and the grid/export layers that consume them.
//!
//! The heavy lifting lives in the member crates; this facade re-exports them
//! so front-ends (CLI, future GUI/web) share one dependency.

pub use astrochop_core as core;
pub use astrochop_ephemeris as ephemeris;
pub use astrochop_export as export;
pub use astrochop_lambert as lambert;
pub use astrochop_porkchop as porkchop;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
