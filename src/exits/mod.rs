//! Exit engine module
//!
//! Capital protection runs before anything else gets to act: the tier
//! ladder closes losers fast and walks profits out gradually.

mod engine;

pub use engine::{ExitConfig, ExitDecision, ExitEngine};
