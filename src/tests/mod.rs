//! Crate-internal test suite
//!
//! - `common`: shared fixtures (scripted generator, vocabularies, catalogs)
//! - `database`: catalog execution tests against SQLite
//! - `property`: proptest invariants for the validator, corrector and dispatcher
//! - `unit`: end-to-end synthesis scenarios and provider HTTP tests

mod common;
mod database;
mod property;
mod unit;
