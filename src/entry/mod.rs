//! Entry gate module
//!
//! Ordered admission checks and the per-symbol submission lifecycle.

mod gate;

pub use gate::{EntryGate, EntryGateConfig, EntryPhase, EntryRejection};
