pub mod llm;
pub mod logging;

// Natural-language query synthesis: validator, correction, dispatch
pub mod synthesis;
