//! Scan scheduling module
//!
//! Urgency classification, per-symbol cadence, and the venue calendar
//! that suppresses scanning while the market is closed.

mod calendar;
mod urgency;

pub use calendar::{parse_weekday, TradingCalendar};
pub use urgency::{classify, ScanScheduler, ScanUrgency, UrgencyThresholds};
