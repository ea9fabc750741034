//! Unit Tests
//!
//! - `synthesis`: end-to-end synthesis scenarios over a scripted generator
//! - `providers`: LLM providers against a wiremock HTTP server

mod providers;
mod synthesis;
