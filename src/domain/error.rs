use thiserror::Error;

use crate::domain::normalize::ValidationError;
use crate::domain::template::RenderError;
use crate::domain::tier::Tier;

/// Library-wide error type for flow execution and gating.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Caller-supplied input failed schema validation. The model is never called.
    #[error("Invalid input: {0}")]
    InvalidInput(ValidationError),

    /// Prompt template failed to render.
    #[error(transparent)]
    Template(#[from] RenderError),

    /// The external model call failed; surfaced verbatim for caller-side retry.
    #[error(transparent)]
    Upstream(#[from] ModelError),

    /// Model response failed schema validation even after default backfill.
    #[error("Malformed model response: {0}")]
    MalformedResponse(ValidationError),

    /// Flow name is not registered.
    #[error("Flow '{0}' is not registered")]
    UnknownFlow(String),

    /// Flow name was registered twice.
    #[error("Flow '{0}' is already registered")]
    DuplicateFlow(String),

    /// Feature identifier has no access rule.
    #[error("Feature '{0}' has no access rule")]
    UnknownFeature(String),

    /// Feature is not unlocked for the caller's tier.
    #[error("Feature '{feature}' is locked for tier {tier}")]
    FeatureLocked { feature: String, tier: Tier },

    /// Startup wiring or configuration issue.
    #[error("{0}")]
    Configuration(String),
}

/// Failure modes at the model-invoker boundary.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request exceeded the configured timeout.
    #[error("Model request timed out")]
    Timeout,

    /// The provider rejected the request with a rate limit (429).
    #[error("Model provider rate limited the request")]
    RateLimited,

    /// The provider returned an error status.
    #[error("Model provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// The provider blocked the prompt or the reply.
    #[error("Model response was blocked by the content filter")]
    ContentFiltered,

    /// The reply could not be parsed into structured output.
    #[error("Model reply was not valid JSON: {0}")]
    MalformedReply(String),

    /// Connection-level failure before a status was received.
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl ModelError {
    /// Whether a retrying client may reattempt this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Timeout | ModelError::RateLimited => true,
            ModelError::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
