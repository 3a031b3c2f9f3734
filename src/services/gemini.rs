//! Google Gemini client for drafting the WhatsApp templates.
//!
//! One `generateContent` call per generation. The model is asked for a JSON
//! object with `welcomeMessage`, `billTemplate` and `kitchenMessage`, and the
//! request carries a response schema so the reply parses directly into
//! [`GeneratedMessages`].

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{ApiKey, CopyGenerator, GenerationError};
use crate::config::GenerationConfig;
use crate::models::{GeneratedMessages, RestaurantConfig};

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiGenerator {
    /// Creates a client from the generation settings.
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Full `generateContent` URL for the configured model.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl CopyGenerator for GeminiGenerator {
    async fn generate_copy(
        &self,
        api_key: &ApiKey,
        config: &RestaurantConfig,
    ) -> Result<GeneratedMessages, GenerationError> {
        info!(
            "Requesting templates for \"{}\" from {}",
            config.name, self.model
        );

        let body = build_request(config);
        let url = self.url();
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Gemini responded {} ({} bytes)", status, text.len());

        if !status.is_success() {
            let message = extract_error_message(&text);
            warn!("Gemini API error {}: {}", status, message);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(&text)
    }
}

/// Builds the prompt describing the restaurant and the three templates.
#[must_use]
pub fn build_prompt(config: &RestaurantConfig) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You write WhatsApp message templates for restaurants that take orders manually over chat."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Restaurant: {}", config.name);
    let _ = writeln!(prompt, "Cuisine / vibe: {}", config.cuisine);
    let _ = writeln!(prompt, "Payment UPI / link: {}", config.payment_handle);
    let _ = writeln!(prompt, "Tone: {}", config.tone.prompt_hint());

    let items: Vec<_> = config
        .menu_items
        .iter()
        .filter(|item| !item.name.trim().is_empty())
        .collect();
    if items.is_empty() {
        let _ = writeln!(prompt, "Popular items: none listed, keep the menu generic.");
    } else {
        let _ = writeln!(prompt, "Popular items:");
        for item in items {
            if item.price.trim().is_empty() {
                let _ = writeln!(prompt, "- {}", item.name.trim());
            } else {
                let _ = writeln!(prompt, "- {} ({})", item.name.trim(), item.price.trim());
            }
        }
    }

    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Write three messages:");
    let _ = writeln!(
        prompt,
        "1. welcomeMessage: auto-reply to a new chat. Greet the customer, list the popular items with prices, and explain how to order."
    );
    let _ = writeln!(
        prompt,
        "2. billTemplate: bill sent manually by staff. Use placeholders [ITEMS] and [TOTAL] and ask for payment to the UPI / link above."
    );
    let _ = writeln!(
        prompt,
        "3. kitchenMessage: auto-reply confirming payment was received and the order is being prepared."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Use WhatsApp formatting only: *bold*, _italic_ and line breaks. No HTML or Markdown headings."
    );
    let _ = write!(
        prompt,
        "Respond with a JSON object with the string fields welcomeMessage, billTemplate and kitchenMessage."
    );

    prompt
}

fn build_request(config: &RestaurantConfig) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart {
                text: build_prompt(config),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            response_mime_type: "application/json",
            response_schema: json!({
                "type": "OBJECT",
                "properties": {
                    "welcomeMessage": { "type": "STRING" },
                    "billTemplate": { "type": "STRING" },
                    "kitchenMessage": { "type": "STRING" }
                },
                "required": ["welcomeMessage", "billTemplate", "kitchenMessage"]
            }),
            temperature: 0.8,
        },
    }
}

/// Extracts the three messages from a raw `generateContent` response body.
pub fn parse_response(body: &str) -> Result<GeneratedMessages, GenerationError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("malformed body: {e}")))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::InvalidResponse(
            "no text in response".to_string(),
        ));
    }

    serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| GenerationError::InvalidResponse(format!("messages are not valid JSON: {e}")))
}

/// Removes a surrounding ```json fence, which some models add despite the schema.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Pulls `error.message` out of a Gemini error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
