//! Synthesis Scenario Tests
//!
//! Whole-pipeline runs: generator reply → validation → correction →
//! dispatch outcome, plus the service's per-request vocabulary.

mod scenarios;
mod service;
