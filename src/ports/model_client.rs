//! Model invoker port definition.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use crate::domain::{ModelConfig, ModelError, Schema};

/// One request across the model boundary.
#[derive(Debug)]
pub struct GenerateRequest<'a> {
    /// The fully rendered prompt text.
    pub prompt: String,
    /// Output schema the provider is asked to conform to.
    pub output_schema: &'a Schema,
    /// Optional per-flow sampling overrides.
    pub config: Option<&'a ModelConfig>,
}

/// Port for generative model calls.
///
/// Implementations return a structured (possibly partially conforming)
/// candidate object or a `ModelError`; conformance checking belongs to the
/// normalizer, not the client. Retry policy, if any, lives behind this
/// boundary — the executor makes exactly one call per invocation.
pub trait ModelClient {
    /// Send a rendered prompt and return the candidate response object.
    fn generate(&self, request: GenerateRequest<'_>) -> Result<Value, ModelError>;
}

/// Scripted client for tests and offline runs: replays queued outcomes in
/// order, one per call.
#[derive(Debug, Default)]
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<Result<Value, ModelError>>>,
}

impl ScriptedModelClient {
    /// Client that answers every call with clones of `reply`.
    pub fn replying(reply: Value) -> Self {
        let client = Self::default();
        client.push(Ok(reply));
        client
    }

    /// Client that fails its first call with `error`.
    pub fn failing(error: ModelError) -> Self {
        let client = Self::default();
        client.push(Err(error));
        client
    }

    /// Queue another outcome.
    pub fn push(&self, outcome: Result<Value, ModelError>) {
        self.replies.lock().unwrap().push_back(outcome);
    }
}

impl ModelClient for ScriptedModelClient {
    fn generate(&self, request: GenerateRequest<'_>) -> Result<Value, ModelError> {
        tracing::debug!(prompt_chars = request.prompt.len(), "scripted model call");
        let mut replies = self.replies.lock().unwrap();
        match replies.len() {
            0 => Err(ModelError::Transport("scripted client has no queued reply".into())),
            // Keep replaying the last outcome so single-reply scripts serve
            // any number of calls.
            1 => match replies.front().unwrap() {
                Ok(value) => Ok(value.clone()),
                Err(_) => replies.pop_front().unwrap(),
            },
            _ => replies.pop_front().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(schema: &Schema) -> GenerateRequest<'_> {
        GenerateRequest { prompt: "prompt".into(), output_schema: schema, config: None }
    }

    #[test]
    fn single_reply_is_replayed() {
        let schema = Schema::new();
        let client = ScriptedModelClient::replying(json!({ "ok": true }));
        assert_eq!(client.generate(request(&schema)).unwrap(), json!({ "ok": true }));
        assert_eq!(client.generate(request(&schema)).unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn queued_outcomes_are_consumed_in_order() {
        let schema = Schema::new();
        let client = ScriptedModelClient::default();
        client.push(Err(ModelError::RateLimited));
        client.push(Ok(json!({ "attempt": 2 })));
        assert!(client.generate(request(&schema)).is_err());
        assert_eq!(client.generate(request(&schema)).unwrap(), json!({ "attempt": 2 }));
    }

    #[test]
    fn empty_script_reports_transport_failure() {
        let schema = Schema::new();
        let client = ScriptedModelClient::default();
        assert!(matches!(client.generate(request(&schema)), Err(ModelError::Transport(_))));
    }
}
