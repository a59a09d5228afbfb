//! Language model access: the caller contract used by the loop, an ordered
//! fallback over model names, and the HTTP backend.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::core::types::ModelReply;
use crate::io::config::ModelConfig;

pub const ALL_MODELS_UNAVAILABLE: &str =
    "All AI models are currently unavailable. Please try again later.";

/// Anything that turns a prompt into text, or fails.
///
/// `None` means no usable response was produced. Implementations handle their
/// own retries and fallbacks.
pub trait ModelCaller {
    fn call(&self, prompt: &str) -> Option<ModelReply>;

    /// User-facing text for when `call` returns `None` outside the loop.
    fn unavailable_message(&self) -> String {
        ALL_MODELS_UNAVAILABLE.to_string()
    }
}

impl<T: ModelCaller + ?Sized> ModelCaller for &T {
    fn call(&self, prompt: &str) -> Option<ModelReply> {
        (**self).call(prompt)
    }

    fn unavailable_message(&self) -> String {
        (**self).unavailable_message()
    }
}

/// One request against one named model.
pub trait ModelBackend {
    fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

/// Tries each model in order until one returns non-empty text.
#[derive(Debug)]
pub struct FallbackModelCaller<B> {
    backend: B,
    models: Vec<String>,
    pinned: bool,
}

impl<B: ModelBackend> FallbackModelCaller<B> {
    pub fn new(backend: B, models: Vec<String>) -> Self {
        Self {
            backend,
            models,
            pinned: false,
        }
    }

    /// Restrict the caller to one model from `known`.
    pub fn pinned(backend: B, known: &[String], model: &str) -> Result<Self> {
        if !known.iter().any(|m| m == model) {
            return Err(anyhow!(
                "invalid model selected: {model} (known: {})",
                known.join(", ")
            ));
        }
        Ok(Self {
            backend,
            models: vec![model.to_string()],
            pinned: true,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

impl<B: ModelBackend> ModelCaller for FallbackModelCaller<B> {
    #[instrument(skip_all, fields(prompt_bytes = prompt.len(), candidates = self.models.len()))]
    fn call(&self, prompt: &str) -> Option<ModelReply> {
        for model in &self.models {
            debug!(model = %model, "calling model");
            match self.backend.generate(model, prompt) {
                Ok(text) if !text.trim().is_empty() => {
                    info!(model = %model, reply_bytes = text.len(), "model responded");
                    return Some(ModelReply::new(text, model.clone()));
                }
                Ok(_) => warn!(model = %model, "model returned empty text"),
                Err(err) => warn!(model = %model, err = %format!("{err:#}"), "model failed"),
            }
        }
        warn!("no model produced a response");
        None
    }

    fn unavailable_message(&self) -> String {
        match (self.pinned, self.models.first()) {
            (true, Some(model)) => format!(
                "The selected model \"{model}\" failed to respond. Please try another model or use auto mode."
            ),
            _ => ALL_MODELS_UNAVAILABLE.to_string(),
        }
    }
}

/// `generateContent` client over blocking HTTP.
pub struct GeminiBackend {
    agent: ureq::Agent,
    url_template: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(config: &ModelConfig, api_key: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            url_template: config.api_url_template.clone(),
            api_key,
        }
    }

    /// Build a backend with the key read from `config.api_key_env`.
    pub fn from_env(config: &ModelConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env)
            .with_context(|| format!("read API key from ${}", config.api_key_env))?;
        if api_key.trim().is_empty() {
            return Err(anyhow!("${} is empty", config.api_key_env));
        }
        Ok(Self::new(config, api_key))
    }

    fn endpoint(&self, model: &str) -> String {
        self.url_template
            .replace("{model}", model)
            .replace("{api_key}", &self.api_key)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl ModelBackend for GeminiBackend {
    fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let payload = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        // ureq errors embed the URL, which carries the key; keep them out of messages.
        let response = match self
            .agent
            .post(&self.endpoint(model))
            .set("Content-Type", "application/json")
            .send_json(payload)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(anyhow!("{model} returned HTTP {code}"));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(anyhow!("{model} request failed: {}", transport.kind()));
            }
        };
        let body: GenerateResponse = response
            .into_json()
            .with_context(|| format!("parse {model} response"))?;
        body.into_text()
            .ok_or_else(|| anyhow!("{model} response has no candidate text"))
    }
}
