//! prop-sentry: risk-governed execution engine for funded trading accounts
//!
//! This library provides the core components for:
//! - Hard daily-loss and total-drawdown governance with timezone-aware
//!   day rollover and crash-safe persistence
//! - Typed client for an external decision service with strict response
//!   validation, bounded timeout, and no retries
//! - Entry admission as an explicit per-symbol state machine
//! - Scaling guardrails and a tiered profit-protection exit ladder
//! - Adaptive scan scheduling against a venue trading calendar
//! - Operator command inbox with at-most-once processing
//! - Simulated execution gateway and deterministic JSONL replay
//! - Full observability stack

pub mod account;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod entry;
pub mod exits;
pub mod gateway;
pub mod history;
pub mod ledger;
pub mod oracle;
pub mod position;
pub mod scaling;
pub mod scheduler;
pub mod telemetry;
