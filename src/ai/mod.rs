//! AI batch classification against an OpenAI-compatible chat endpoint.
//!
//! - `client` - thin HTTP client for `/chat/completions`
//! - `prompts` - system instruction and per-batch user message
//! - `parse` - tolerant JSONL extraction from model output
//! - `classifier` - batching, fallback, and rule-floor merge logic

pub mod classifier;
pub mod client;
pub mod parse;
pub mod prompts;

pub use classifier::{classify_records, merge_batch, BatchOutcome};
pub use client::ChatClient;
