//! moonsignal: schema-validated generative flows with tier-based feature gating.
//!
//! A flow is a named operation that validates a typed input record, renders
//! it into a prompt, sends the prompt to a generative model, and normalizes
//! the response against a declared output schema (backfilling declared
//! defaults and stamping generated-at timestamps). The tier gate is an
//! independent pure table answering which features a subscription tier
//! unlocks.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;

pub use adapters::{HttpModelClient, MiniJinjaRenderer};
pub use app::catalog::{self, builtin_features, builtin_gate, builtin_registry};
pub use app::config::{API_KEY_ENV, ModelApiConfig};
pub use app::executor::{FlowExecutor, Stage};
pub use domain::{
    AccessRule, FieldKind, FieldSchema, FlowDefinition, FlowError, FlowRegistry, ModelConfig,
    ModelError, Record, RenderError, Schema, TemplateRenderer, Tier, TierGate, ValidationError,
    ValidationReason, normalize,
};
pub use ports::{GenerateRequest, ModelClient, ScriptedModelClient};

/// Wire an executor with the builtin flow catalog and access rules.
pub fn builtin_executor<C: ModelClient>(
    client: C,
) -> Result<FlowExecutor<C, MiniJinjaRenderer>, FlowError> {
    let registry = builtin_registry()?;
    let gate = builtin_gate()?;
    Ok(FlowExecutor::new(registry, MiniJinjaRenderer::new(), client, gate))
}
