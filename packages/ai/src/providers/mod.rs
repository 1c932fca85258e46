//! LLM provider abstraction and implementations.
//!
//! Supports Anthropic Claude and `OpenAI`-compatible servers via a
//! common trait. Providers here do one thing: take a system prompt plus
//! a sequence of text/image prompt parts and return the model's raw
//! text reply. Parsing into a flow's output schema happens in
//! [`crate::flows`].

pub mod anthropic;
pub mod openai;

use crate::AiError;

/// One piece of a prompt. Flows compose these; providers encode them
/// into their wire format.
#[derive(Debug, Clone)]
pub enum PromptPart {
    /// Plain text.
    Text(String),
    /// An inline image as a data URI
    /// (`data:<mimetype>;base64,<encoded_data>`).
    Image(String),
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a single-turn request and returns the model's text reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider rejects
    /// the prompt.
    async fn generate(&self, system_prompt: &str, parts: &[PromptPart])
    -> Result<String, AiError>;
}

/// A parsed `data:<mimetype>;base64,<data>` URI.
pub struct DataUri<'a> {
    /// MIME type, e.g. `image/png`.
    pub media_type: &'a str,
    /// The base64 payload.
    pub data: &'a str,
}

/// Splits a base64 data URI into its media type and payload.
///
/// # Errors
///
/// Returns [`AiError::Provider`] if the string is not a base64 data URI.
pub fn parse_data_uri(uri: &str) -> Result<DataUri<'_>, AiError> {
    let rest = uri.strip_prefix("data:").ok_or_else(|| AiError::Provider {
        message: "Image is not a data URI".to_string(),
    })?;
    let (media_type, data) =
        rest.split_once(";base64,")
            .ok_or_else(|| AiError::Provider {
                message: "Image data URI is not base64-encoded".to_string(),
            })?;
    Ok(DataUri { media_type, data })
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 2. `OPENAI_API_KEY` set -> `OpenAI` GPT
/// 3. `AI_BASE_URL` set -> `OpenAI`-compatible server, no key required
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| detect_provider());

    match provider.to_lowercase().as_str() {
        "anthropic" | "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| AiError::Config {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
            let model = std::env::var("AI_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        "openai" | "gpt" => {
            let base_url = std::env::var("AI_BASE_URL").ok();
            let api_key = match std::env::var("OPENAI_API_KEY") {
                Ok(key) => key,
                // Local OpenAI-compatible servers accept any key.
                Err(_) if base_url.is_some() => "unused".to_string(),
                Err(_) => {
                    return Err(AiError::Config {
                        message: "OPENAI_API_KEY environment variable not set".to_string(),
                    });
                }
            };
            let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
            Ok(Box::new(openai::OpenAiProvider::new(
                api_key, model, base_url,
            )))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'anthropic' or 'openai'."),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_provider_from_env`].
fn detect_provider() -> String {
    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic".to_string();
    }

    if std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("AI_BASE_URL").is_ok() {
        log::info!("Auto-detected AI provider: OpenAI-compatible");
        return "openai".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set ANTHROPIC_API_KEY, OPENAI_API_KEY, \
         or AI_BASE_URL. You can also set AI_PROVIDER explicitly."
    );

    // Fall back to anthropic; the missing-key error names the variable.
    "anthropic".to_string()
}
