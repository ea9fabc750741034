//! Catalog Database Tests
//!
//! Constraint execution, imports and vocabulary reads against SQLite.

mod search;
