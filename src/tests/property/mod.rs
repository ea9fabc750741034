//! Property-based tests for query synthesis
//!
//! This module contains property-based tests using the proptest framework.
//! Property tests verify invariants that should hold for all inputs, rather
//! than testing specific cases.
//!
//! ## Running Property Tests
//!
//! ```sh
//! cargo test property --release
//! ```
//!
//! ## Test Modules
//!
//! - `validator_props`: the predicate validator
//!   - Separators, comment markers and denied keywords always reject
//!   - Identifiers outside the column whitelist always reject
//!   - Accepted fragments are balanced and bounded
//!   - Validation is idempotent
//!
//! - `correction_props`: similarity scoring and fuzzy correction
//!   - Scores stay within `[0, 1]`
//!   - Corrections only ever produce a vocabulary entry or the input
//!
//! - `dispatcher_props`: dispatch outcomes
//!   - A rejected SQL fragment never yields `sql_where_clause`
//!   - Two failed paths yield `none` with no constraint
//!   - The generator is called at most once per path
//!
//! By default, proptest runs 256 cases per property. This can be configured
//! via the `PROPTEST_CASES` environment variable.

mod correction_props;
mod dispatcher_props;
