//! Integration test entry point

mod config_test;
mod engine_test;
mod ledger_test;
mod support;
