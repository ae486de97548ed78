use std::env;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use serde::Deserialize;

const GENERATE_ENDPOINT: &str = "https://api.cohere.ai/v1/generate";
const DEFAULT_MODEL: &str = "command-r-plus";

/// Defines one synchronous text-generation call: a prompt plus decoding
/// parameters. The provider returns the generated text in a single response.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }
}

/// Captures basic token usage metrics associated with a call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub response_tokens: usize,
    pub total_tokens: usize,
}

/// Full response surface returned to callers.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub token_usage: TokenUsage,
    pub model: String,
    pub raw: serde_json::Value,
}

/// Main entry point for invoking the generation provider.
#[derive(Clone)]
pub struct GenerationClient {
    http: Client,
    api_key: String,
    model: String,
}

impl GenerationClient {
    /// Build a client using environment variables. `COHERE_API_KEY` is
    /// required; `GENERATION_MODEL` overrides the default model identifier.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("COHERE_API_KEY").context("COHERE_API_KEY env var is missing")?;
        let model = env::var("GENERATION_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            http: Client::new(),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Execute a generation request. Blocks the calling task until the
    /// provider answers in full; no retries, no partial output.
    pub async fn execute(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let prompt_tokens = approximate_token_count(&request.prompt);

        let payload = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(GENERATE_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("failed to read response body")?;
        let body: serde_json::Value = serde_json::from_str(&response_text).with_context(|| {
            let preview = if response_text.len() > 500 {
                format!("{}...", &response_text[..500])
            } else {
                response_text.clone()
            };
            format!(
                "failed to parse generation response as JSON. Response body: {}",
                preview
            )
        })?;
        if !status.is_success() {
            bail!("generation call failed with status {}: {}", status, body);
        }

        let (text, usage) = extract_text_and_usage(&body)
            .ok_or_else(|| anyhow!("unexpected generation response payload: {}", body))?;

        let mut token_usage = usage.unwrap_or_else(|| TokenUsage {
            prompt_tokens,
            response_tokens: approximate_token_count(&text),
            total_tokens: prompt_tokens + approximate_token_count(&text),
        });
        if token_usage.prompt_tokens == 0 {
            token_usage.prompt_tokens = prompt_tokens;
        }
        if token_usage.response_tokens == 0 {
            token_usage.response_tokens = approximate_token_count(&text);
        }
        token_usage.total_tokens = token_usage.prompt_tokens + token_usage.response_tokens;

        Ok(GenerateResponse {
            text,
            token_usage,
            model: self.model.clone(),
            raw: body,
        })
    }
}

/// Extract generated text and optional usage metrics from the provider payload.
/// The first generation wins; providers may return several candidates.
fn extract_text_and_usage(value: &serde_json::Value) -> Option<(String, Option<TokenUsage>)> {
    let payload = serde_json::from_value::<GeneratePayload>(value.clone()).ok()?;

    let text = payload
        .generations
        .into_iter()
        .next()
        .map(|generation| generation.text.trim().to_string())?;

    let usage = payload
        .meta
        .and_then(|meta| meta.billed_units)
        .map(|units| TokenUsage {
            prompt_tokens: units.input_tokens.unwrap_or_default(),
            response_tokens: units.output_tokens.unwrap_or_default(),
            total_tokens: units.input_tokens.unwrap_or_default()
                + units.output_tokens.unwrap_or_default(),
        });

    Some((text, usage))
}

fn approximate_token_count(input: &str) -> usize {
    if input.trim().is_empty() {
        return 0;
    }
    input
        .split_whitespace()
        .filter(|segment| !segment.is_empty())
        .count()
}

#[derive(Debug, Deserialize)]
struct GeneratePayload {
    #[serde(default)]
    generations: Vec<Generation>,
    #[serde(default)]
    meta: Option<GenerateMeta>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateMeta {
    #[serde(default)]
    billed_units: Option<BilledUnits>,
}

#[derive(Debug, Deserialize)]
struct BilledUnits {
    #[serde(default)]
    input_tokens: Option<usize>,
    #[serde(default)]
    output_tokens: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_generation_text() {
        let body = serde_json::json!({
            "id": "abc",
            "generations": [
                { "id": "g1", "text": "  fn main() {}  " },
                { "id": "g2", "text": "ignored" }
            ],
            "meta": { "billed_units": { "input_tokens": 12, "output_tokens": 40 } }
        });

        let (text, usage) = extract_text_and_usage(&body).expect("payload should parse");
        assert_eq!(text, "fn main() {}");
        let usage = usage.expect("usage should be present");
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.response_tokens, 40);
    }

    #[test]
    fn empty_generations_yield_none() {
        let body = serde_json::json!({ "id": "abc", "generations": [] });
        assert!(extract_text_and_usage(&body).is_none());
    }

    #[test]
    fn missing_usage_falls_back_to_approximation() {
        let body = serde_json::json!({
            "generations": [ { "text": "three word answer" } ]
        });
        let (text, usage) = extract_text_and_usage(&body).expect("payload should parse");
        assert_eq!(text, "three word answer");
        assert!(usage.is_none());
        assert_eq!(approximate_token_count(&text), 3);
    }
}
