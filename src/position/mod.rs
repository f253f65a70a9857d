//! Position model and book
//!
//! Positions are created, mutated, and destroyed only from confirmed
//! execution results.

mod book;
mod types;

pub use book::PositionBook;
pub use types::{ClosedPosition, Direction, ExitReason, Position};
