//! Cycle orchestration and deterministic replay

mod cycle;
mod replay;

pub use cycle::{CycleReport, Engine};
pub use replay::{ReplayEvent, ReplayFeed};
