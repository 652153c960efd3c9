//! base-inf core: the greedy generation loop and the run around it.

pub mod config;
pub mod engine;
pub mod output;
pub mod stats;

pub use config::{DEFAULT_N_PREDICT, DEFAULT_PROMPT, RunConfig};
pub use engine::{GenerationDriver, run, run_with_model};
pub use output::PieceWriter;
pub use stats::{GenerationReport, StopReason};
