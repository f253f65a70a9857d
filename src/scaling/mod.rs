//! Position scaling module
//!
//! Guardrails for adding to winners and clamps for reducing anything.

mod controller;

pub use controller::{ScaleOutPlan, ScaleRejection, ScalingConfig, ScalingController};
