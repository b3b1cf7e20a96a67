//! State module for tracking run progress
//!
//! - `RunPhase`: the phase a harvest run is in, with its legal transitions

mod run_phase;

pub use run_phase::RunPhase;
