#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Structured-output LLM flows with provider abstraction.
//!
//! Supports Anthropic Claude, `OpenAI` GPT, and any `OpenAI`-compatible
//! local/self-hosted server (Ollama, vLLM, llama.cpp, LM Studio) via the
//! `AI_BASE_URL` environment variable. Unlike a chat agent, every call
//! here is a single request that must come back as a JSON object
//! matching a flow's output schema. The three configured flows are tile
//! planning recommendations, metric estimation from a map snapshot, and
//! city geocoding.

pub mod flows;
pub mod providers;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The model's reply did not contain a parseable JSON object.
    #[error("Malformed model output for flow '{flow}': {message}")]
    MalformedOutput {
        /// Which flow produced the reply.
        flow: &'static str,
        /// Description of the parse failure.
        message: String,
    },

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The call did not complete within the bounded timeout.
    #[error("AI call timed out after {seconds}s")]
    Timeout {
        /// The configured timeout.
        seconds: u64,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
