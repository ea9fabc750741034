//! LLM Provider Unit Tests
//!
//! Uses wiremock for HTTP mocking to test:
//! - API request formatting
//! - Response parsing (success and error cases)
//! - Rate limit and authentication error mapping
//! - Generator adapter error mapping over real HTTP responses
