//! Stock Watch Agent
//!
//! An LLM-driven agent that turns natural-language requests such as
//! "watch Tesla with 3% threshold" into watchlist entries:
//! - Talks to the model through a small text directive protocol
//! - Runs whitelisted actions (symbol lookup, quotes, threshold math, watchlist edits)
//! - Persists settings, the watchlist and a bounded agent log
//! - Periodically re-prices the watchlist and raises band alerts
//!
//! AGENT LOOP:
//! PROMPT → LLM → PARSE → EXECUTE → (append to transcript) → PROMPT ...

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod gemini;
pub mod models;
pub mod monitor;
pub mod parser;
pub mod prompt;
pub mod quotes;
pub mod runtime;
pub mod state;
pub mod tools;
pub mod watchlist;

pub use error::Result;

// Re-export common types
pub use models::*;
