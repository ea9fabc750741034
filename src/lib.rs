/// NLQ Catalog - natural-language search over a book catalog
///
/// Core library turning free-text queries into validated SQL predicates or
/// typed filter sets, plus the SQLite catalog they run against.

pub mod config;
pub mod core;
pub mod database;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
