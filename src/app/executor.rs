//! Flow invocation pipeline.
//!
//! One invocation walks `Validating → Rendering → Invoking → Normalizing →
//! Done`, strictly sequential, one best-effort attempt. The executor holds
//! no per-call state: the registry, renderer, and gate are read-only after
//! startup, so any number of invocations may run concurrently.

use std::fmt;

use chrono::Utc;
use serde_json::Value;

use crate::domain::{
    FlowError, FlowRegistry, Record, TemplateRenderer, Tier, TierGate, normalize,
};
use crate::ports::{GenerateRequest, ModelClient};

/// Pipeline stage of a flow invocation, used for failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Rendering,
    Invoking,
    Normalizing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Rendering => "rendering",
            Stage::Invoking => "invoking",
            Stage::Normalizing => "normalizing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FlowError {
    /// The pipeline stage this error belongs to, if it arose inside an
    /// invocation. Startup wiring errors have no stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FlowError::UnknownFlow(_) | FlowError::InvalidInput(_) => Some(Stage::Validating),
            FlowError::Template(_) => Some(Stage::Rendering),
            FlowError::Upstream(_) => Some(Stage::Invoking),
            FlowError::MalformedResponse(_) => Some(Stage::Normalizing),
            _ => None,
        }
    }
}

/// Orchestrates single flow invocations against an immutable registry.
pub struct FlowExecutor<C, R> {
    registry: FlowRegistry,
    renderer: R,
    client: C,
    gate: TierGate,
}

impl<C, R> FlowExecutor<C, R>
where
    C: ModelClient,
    R: TemplateRenderer,
{
    /// Wire an executor from startup configuration.
    pub fn new(registry: FlowRegistry, renderer: R, client: C, gate: TierGate) -> Self {
        Self { registry, renderer, client, gate }
    }

    /// The access-rule table, for presentation-layer visibility decisions.
    pub fn gate(&self) -> &TierGate {
        &self.gate
    }

    /// The flow catalog.
    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Run one flow invocation end to end.
    ///
    /// Input is validated (and default-backfilled) before anything else, so
    /// a bad call never costs a model request. The result is returned fully
    /// normalized or not at all.
    pub fn execute(&self, flow_name: &str, raw_input: &Value) -> Result<Record, FlowError> {
        let flow = self.registry.lookup(flow_name)?;

        tracing::debug!(flow = flow_name, stage = %Stage::Validating, "validating input");
        let input = normalize(&flow.input_schema, raw_input, Utc::now())
            .map_err(FlowError::InvalidInput)?;

        tracing::debug!(flow = flow_name, stage = %Stage::Rendering, "rendering prompt");
        let prompt = self.renderer.render(&flow.prompt_template, &input, flow_name)?;

        tracing::debug!(
            flow = flow_name,
            stage = %Stage::Invoking,
            prompt_chars = prompt.len(),
            "invoking model"
        );
        let candidate = self
            .client
            .generate(GenerateRequest {
                prompt,
                output_schema: &flow.output_schema,
                config: flow.model_config.as_ref(),
            })
            .map_err(|e| {
                tracing::error!(flow = flow_name, error = %e, "model invocation failed");
                FlowError::Upstream(e)
            })?;

        tracing::debug!(flow = flow_name, stage = %Stage::Normalizing, "normalizing response");
        let output = normalize(&flow.output_schema, &candidate, Utc::now())
            .map_err(FlowError::MalformedResponse)?;

        tracing::debug!(flow = flow_name, "flow completed");
        Ok(output)
    }

    /// Run one flow invocation on behalf of a caller at `tier`, enforcing
    /// the tier gate at the execution boundary. A locked flow fails with
    /// `FeatureLocked` before any validation or model work.
    pub fn execute_for(
        &self,
        tier: Tier,
        flow_name: &str,
        raw_input: &Value,
    ) -> Result<Record, FlowError> {
        if !self.gate.is_unlocked(tier, flow_name) {
            return Err(FlowError::FeatureLocked { feature: flow_name.to_string(), tier });
        }
        self.execute(flow_name, raw_input)
    }
}
