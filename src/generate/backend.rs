//! Backend call contract and the HTTP implementation.
//!
//! The engine treats the backend as an opaque collaborator: it hands over
//! a model identifier and a validated request, and gets back raw text or a
//! failure whose message is preserved verbatim so the classifier can
//! inspect it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AnimflowError, Result, config::BackendConfig, generate::GenerationRequest};

/// Sampling temperature used for every generation call.
const TEMPERATURE: f64 = 0.7;

/// Prompt template wrapping the source markup and the user instruction.
const PROMPT_TEMPLATE: &str = "You are an expert in SVG animation. Your role is to create smooth, \
elegant SVG animations based on the provided SVG and the user's instruction.

Important rules:
1. Keep the original structure and design of the SVG
2. Only add relevant and subtle animations
3. Use <animate>, <animateTransform> or <animateMotion> elements
4. Make sure the animations are smooth and not distracting
5. Return ONLY the complete and valid SVG code
6. Do not include any explanatory text, only the SVG code

The provided SVG:
{source}

The animation instruction:
{instruction}";

/// Contract between the fallback engine and a generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Invoke the backend with one model and one request.
    ///
    /// Failure messages must be propagated verbatim; the classifier
    /// decides what they mean.
    async fn invoke(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String>;

    /// List the models the backend can serve.
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Err(AnimflowError::Session("model listing is not supported by this backend".to_string()))
    }
}

/// One entry of the backend's model listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Generation backend speaking the generative-language HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Assemble the full prompt sent to the model.
    fn build_prompt(request: &GenerationRequest) -> String {
        PROMPT_TEMPLATE.replace("{source}", request.source_content()).replace("{instruction}", request.instruction_text())
    }

    fn backend_error(
        model: &str,
        message: String,
    ) -> AnimflowError {
        AnimflowError::Backend {
            model: model.to_string(),
            message,
            quota_exceeded: false,
            retry_after_seconds: None,
        }
    }

    /// Pull the generated text out of a generateContent response.
    fn extract_text(value: &Value) -> Option<String> {
        let parts = value.get("candidates")?.get(0)?.get("content")?.get("parts")?.as_array()?;
        let text: String = parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn invoke(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        let payload = json!({
            "contents": [{ "parts": [{ "text": Self::build_prompt(request) }] }],
            "generationConfig": { "temperature": TEMPERATURE },
        });

        tracing::trace!(model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| Self::backend_error(model, err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(Self::backend_error(model, format!("{}: {}", status, body)));
        }

        let value: Value = response.json().await.map_err(|err| Self::backend_error(model, format!("response parse failed: {}", err)))?;

        Self::extract_text(&value).ok_or_else(|| Self::backend_error(model, "backend returned no candidates".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            models: Vec<ModelEntry>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ModelEntry {
            name: String,
            #[serde(default)]
            display_name: Option<String>,
            #[serde(default)]
            description: Option<String>,
        }

        let url = format!("{}/models", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| AnimflowError::Session(format!("failed to list models: {}", err)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(AnimflowError::Session(format!("failed to list models ({}): {}", status, body)));
        }

        let listing: Listing = response.json().await.map_err(|err| AnimflowError::Session(format!("model listing parse failed: {}", err)))?;

        Ok(listing
            .models
            .into_iter()
            .map(|entry| ModelInfo {
                name: entry.name,
                display_name: entry.display_name,
                description: entry.description,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_embeds_request() {
        let request = GenerationRequest::new("<svg id=\"a\"/>", "make it pulse").unwrap();
        let prompt = HttpBackend::build_prompt(&request);
        assert!(prompt.contains("<svg id=\"a\"/>"));
        assert!(prompt.contains("make it pulse"));
        assert!(prompt.starts_with("You are an expert in SVG animation"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let value = serde_json::json!({
            "candidates": [{
                "content": { "parts": [ { "text": "<svg>" }, { "text": "</svg>" } ] }
            }]
        });
        assert_eq!(HttpBackend::extract_text(&value), Some("<svg></svg>".to_string()));
    }

    #[test]
    fn test_extract_text_empty_response() {
        let value = serde_json::json!({ "candidates": [] });
        assert_eq!(HttpBackend::extract_text(&value), None);
    }
}
