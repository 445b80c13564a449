//! Train brake simulation over resolved consists.
//!
//! The workspace crates do the work: `railbrake_consist` turns consist files into vehicle
//! lists, `railbrake_brakes` simulates the brakes of a train of cars, `railbrake_config`
//! loads ratings and scenarios, and `railbrake_export` writes traces. This crate ties them
//! together for the command-line front-ends.

pub mod scenario;

pub use railbrake_brakes as brakes;
pub use railbrake_config as config;
pub use railbrake_consist as consist;
pub use railbrake_export as export;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
