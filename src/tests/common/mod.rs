//! Common Test Utilities
//!
//! Shared test helpers and fixtures used across test modules:
//! - Scripted generators with call recording (`fixtures`)
//! - Sample vocabularies and catalogs (`fixtures`)

pub mod fixtures;

pub use fixtures::*;
