//! Model provider client implementation using reqwest.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use crate::app::config::{API_KEY_ENV, ModelApiConfig};
use crate::domain::{FieldKind, FieldSchema, FlowError, ModelError, Schema};
use crate::ports::{GenerateRequest, ModelClient};

const X_GOOG_API_KEY: &str = "X-Goog-Api-Key";

/// Counting gate bounding concurrent in-flight requests. The provider rate
/// limits aggressively, so callers queue here instead of collecting 429s.
#[derive(Debug)]
struct FlightLimiter {
    in_flight: Mutex<u32>,
    released: Condvar,
    capacity: u32,
}

impl FlightLimiter {
    fn new(capacity: u32) -> Self {
        Self { in_flight: Mutex::new(0), released: Condvar::new(), capacity: capacity.max(1) }
    }

    fn acquire(self: &Arc<Self>) -> FlightPermit {
        let mut count = self.in_flight.lock().unwrap();
        while *count >= self.capacity {
            count = self.released.wait(count).unwrap();
        }
        *count += 1;
        FlightPermit { limiter: Arc::clone(self) }
    }
}

struct FlightPermit {
    limiter: Arc<FlightLimiter>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        let mut count = self.limiter.in_flight.lock().unwrap();
        *count -= 1;
        self.limiter.released.notify_one();
    }
}

/// HTTP client for a Gemini-style structured-generation endpoint.
///
/// Carries the mandatory request timeout and a bounded exponential-backoff
/// retry loop for retryable failures. Retries live here, behind the model
/// boundary; the executor itself makes a single best-effort attempt.
#[derive(Clone)]
pub struct HttpModelClient {
    api_key: String,
    api_url: Url,
    max_retries: u32,
    retry_delay_ms: u64,
    client: Client,
    limiter: Arc<FlightLimiter>,
}

impl std::fmt::Debug for HttpModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpModelClient")
            .field("api_url", &self.api_url)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl HttpModelClient {
    /// Create a client with the given API key and configuration.
    pub fn new(api_key: String, config: &ModelApiConfig) -> Result<Self, FlowError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FlowError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            api_url: config.api_url.clone(),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            client,
            limiter: Arc::new(FlightLimiter::new(config.max_in_flight)),
        })
    }

    /// Create from the `MOONSIGNAL_API_KEY` environment variable.
    pub fn from_env(config: &ModelApiConfig) -> Result<Self, FlowError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            FlowError::Configuration(format!("{API_KEY_ENV} environment variable not set"))
        })?;
        Self::new(api_key, config)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl ModelClient for HttpModelClient {
    fn generate(&self, request: GenerateRequest<'_>) -> Result<Value, ModelError> {
        let api_request = ApiRequest {
            contents: vec![Content { parts: vec![Part { text: request.prompt }] }],
            generation_config: GenerationConfig {
                temperature: request.config.and_then(|c| c.temperature),
                max_output_tokens: request.config.and_then(|c| c.max_output_tokens),
                response_mime_type: "application/json",
                response_schema: response_schema(request.output_schema),
            },
        };

        // One permit spans the whole attempt loop so retries of a single
        // invocation do not multiply in-flight pressure.
        let _permit = self.limiter.acquire();

        let mut last_error = None;
        let max_attempts = self.max_retries.max(1);

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.retry_delay_ms * 2_u64.pow(attempt.saturating_sub(1));
                std::thread::sleep(Duration::from_millis(delay));
                tracing::debug!(attempt = attempt + 1, max_attempts, "retrying model request");
            }

            match self.send_request(&api_request) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if e.is_retryable() {
                        tracing::warn!(error = %e, "retryable model failure");
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ModelError::Transport("Request failed after all retries".into())))
    }
}

impl HttpModelClient {
    fn send_request(&self, request: &ApiRequest) -> Result<Value, ModelError> {
        let response = self
            .client
            .post(self.api_url.clone())
            .header(X_GOOG_API_KEY, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let api_response: ApiResponse = response
                .json()
                .map_err(|e| ModelError::MalformedReply(format!("unparseable body: {e}")))?;
            extract_candidate(api_response)
        } else if status.as_u16() == 429 {
            Err(ModelError::RateLimited)
        } else {
            let message = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            Err(ModelError::Provider { status: status.as_u16(), message })
        }
    }
}

fn extract_candidate(response: ApiResponse) -> Result<Value, ModelError> {
    if let Some(feedback) = &response.prompt_feedback {
        if feedback.block_reason.is_some() {
            return Err(ModelError::ContentFiltered);
        }
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::MalformedReply("no candidates in response".into()))?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ModelError::ContentFiltered);
    }

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| ModelError::MalformedReply("candidate has no content".into()))?;

    serde_json::from_str(&text).map_err(|_| ModelError::MalformedReply(truncate(&text)))
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}…")
    }
}

/// Serialize a schema tree into the provider's `responseSchema` shape so the
/// provider constrains decoding to the declared structure.
fn response_schema(schema: &Schema) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for (name, field) in schema {
        properties.insert(name.clone(), field_schema(field));
        if field.required {
            required.push(json!(name));
        }
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

fn field_schema(field: &FieldSchema) -> Value {
    let mut value = match &field.kind {
        FieldKind::String | FieldKind::Timestamp => json!({ "type": "string" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Integer { min, max } => {
            let mut v = json!({ "type": "integer" });
            if let Some(lo) = min {
                v["minimum"] = json!(lo);
            }
            if let Some(hi) = max {
                v["maximum"] = json!(hi);
            }
            v
        }
        FieldKind::Number { min, max } => {
            let mut v = json!({ "type": "number" });
            if let Some(lo) = min {
                v["minimum"] = json!(lo);
            }
            if let Some(hi) = max {
                v["maximum"] = json!(hi);
            }
            v
        }
        FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
        FieldKind::Array(item) => json!({ "type": "array", "items": field_schema(item) }),
        FieldKind::Object(fields) => response_schema(fields),
    };
    if let Some(description) = &field.description {
        value["description"] = json!(description);
    }
    value
}
