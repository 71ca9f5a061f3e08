use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client as OpenAIClient;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use std::fmt;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};
use unicode_segmentation::UnicodeSegmentation;

use crate::environment::{get_env_var_or, get_optional_env_var};
use crate::nlp::sentences::FINANCIAL_KEYWORDS;
use crate::TARGET_LLM_REQUEST;

const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// How a generation attempt failed. Auth failures are sticky at the
/// engine level; the rest are retried.
#[derive(Clone, Debug)]
pub enum BackendError {
    Auth(String),
    RateLimited(String),
    Transient(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Auth(msg) => write!(f, "authentication error: {msg}"),
            BackendError::RateLimited(msg) => write!(f, "rate limited: {msg}"),
            BackendError::Transient(msg) => write!(f, "transient error: {msg}"),
        }
    }
}

/// Buckets an error message the way the providers phrase them.
fn classify_error_message(message: String) -> BackendError {
    let lower = message.to_lowercase();
    if lower.contains("invalid_api_key")
        || lower.contains("incorrect api key")
        || lower.contains("authentication")
        || lower.contains("unauthorized")
    {
        BackendError::Auth(message)
    } else if lower.contains("rate_limit") || lower.contains("rate limit") || lower.contains("429")
    {
        BackendError::RateLimited(message)
    } else {
        BackendError::Transient(message)
    }
}

/// The generation capability behind the summarization engine: a local
/// model, an OpenAI-compatible remote API, or the deterministic
/// rules-based generator. The engine does not care which.
#[derive(Clone, Debug)]
pub enum GenerationBackend {
    Ollama { client: Ollama, model: String },
    OpenAi {
        client: OpenAIClient<OpenAIConfig>,
        model: String,
    },
    Rules(RulesGenerator),
}

impl GenerationBackend {
    /// Backend selection from the environment: an OpenAI-compatible key
    /// wins, then a configured Ollama model, else no backend (the engine
    /// runs on templates alone).
    pub fn from_environment() -> Option<Self> {
        if let Some(api_key) = get_optional_env_var("OPENAI_API_KEY") {
            let mut config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(base) = get_optional_env_var("OPENAI_API_BASE") {
                config = config.with_api_base(base);
            }
            let model = get_env_var_or("OPENAI_MODEL", "gpt-4o-mini");
            info!(target: TARGET_LLM_REQUEST, "Using OpenAI-compatible backend with model {}", model);
            return Some(GenerationBackend::OpenAi {
                client: OpenAIClient::with_config(config),
                model,
            });
        }
        if let Some(model) = get_optional_env_var("OLLAMA_MODEL") {
            let host = get_env_var_or("OLLAMA_HOST", "localhost");
            let port = crate::environment::get_env_var_as("OLLAMA_PORT", 11434u16);
            info!(target: TARGET_LLM_REQUEST, "Using Ollama backend at {}:{} with model {}", host, port, model);
            return Some(GenerationBackend::Ollama {
                client: Ollama::new(host, port),
                model,
            });
        }
        info!(target: TARGET_LLM_REQUEST, "No generation backend configured");
        None
    }

    pub async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        match self {
            GenerationBackend::Ollama { client, model } => {
                let mut request = GenerationRequest::new(model.clone(), prompt.to_string());
                request.options = Some(GenerationOptions::default().temperature(temperature));
                debug!(target: TARGET_LLM_REQUEST, "Sending Ollama request ({} chars)", prompt.len());
                match timeout(GENERATION_TIMEOUT, client.generate(request)).await {
                    Ok(Ok(response)) => Ok(response.response),
                    Ok(Err(err)) => Err(classify_error_message(err.to_string())),
                    Err(_) => Err(BackendError::Transient("request timed out".to_string())),
                }
            }
            GenerationBackend::OpenAi { client, model } => {
                let message = ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|err| BackendError::Transient(err.to_string()))?;
                let request = CreateChatCompletionRequestArgs::default()
                    .model(model)
                    .temperature(temperature)
                    .messages([message.into()])
                    .build()
                    .map_err(|err| BackendError::Transient(err.to_string()))?;
                debug!(target: TARGET_LLM_REQUEST, "Sending chat completion request ({} chars)", prompt.len());
                match timeout(GENERATION_TIMEOUT, client.chat().create(request)).await {
                    Ok(Ok(response)) => Ok(response
                        .choices
                        .first()
                        .and_then(|choice| choice.message.content.clone())
                        .unwrap_or_default()),
                    Ok(Err(err)) => Err(classify_error_message(err.to_string())),
                    Err(_) => Err(BackendError::Transient("request timed out".to_string())),
                }
            }
            GenerationBackend::Rules(rules) => Ok(rules.generate(prompt)),
        }
    }
}

/// Deterministic extractive generator: picks the most finance-laden
/// sentences out of the prompt payload. No network, never fails, same
/// input always yields the same output.
#[derive(Clone, Copy, Debug, Default)]
pub struct RulesGenerator;

impl RulesGenerator {
    const MAX_SENTENCES: usize = 3;

    pub fn generate(&self, prompt: &str) -> String {
        // The first paragraph is the instruction; the payload follows.
        let payload = prompt.split_once("\n\n").map_or(prompt, |(_, rest)| rest);

        let mut scored: Vec<(&str, usize)> = payload
            .unicode_sentences()
            .map(|sentence| {
                let lower = sentence.to_lowercase();
                let hits = FINANCIAL_KEYWORDS
                    .iter()
                    .filter(|keyword| lower.contains(*keyword))
                    .count();
                (sentence, hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(Self::MAX_SENTENCES);

        if scored.is_empty() {
            return String::new();
        }
        scored
            .iter()
            .map(|(sentence, _)| sentence.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_messages_classify_as_auth() {
        assert!(matches!(
            classify_error_message("invalid_api_key: check your key".into()),
            BackendError::Auth(_)
        ));
        assert!(matches!(
            classify_error_message("Authentication failed".into()),
            BackendError::Auth(_)
        ));
    }

    #[test]
    fn rate_limit_messages_classify_as_rate_limited() {
        assert!(matches!(
            classify_error_message("rate_limit_exceeded, slow down".into()),
            BackendError::RateLimited(_)
        ));
        assert!(matches!(
            classify_error_message("HTTP 429 returned".into()),
            BackendError::RateLimited(_)
        ));
    }

    #[test]
    fn everything_else_is_transient() {
        assert!(matches!(
            classify_error_message("connection reset by peer".into()),
            BackendError::Transient(_)
        ));
    }

    #[test]
    fn rules_generator_is_deterministic_and_extractive() {
        let rules = RulesGenerator;
        let prompt = "Analyze this.\n\nAcme reported record earnings growth. \
            The sky was blue. Analysts raised their price target.";
        let first = rules.generate(prompt);
        assert_eq!(first, rules.generate(prompt));
        assert!(first.contains("earnings"));
        assert!(!first.contains("sky was blue"));
    }
}
