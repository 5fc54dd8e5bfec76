use crate::domain::schema::Schema;

/// Sampling overrides forwarded to the model provider.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelConfig {
    /// Sampling temperature; provider default when unset.
    pub temperature: Option<f64>,
    /// Hard cap on generated tokens; provider default when unset.
    pub max_output_tokens: Option<u32>,
}

impl ModelConfig {
    /// Config that only overrides the sampling temperature.
    pub fn with_temperature(temperature: f64) -> Self {
        Self { temperature: Some(temperature), max_output_tokens: None }
    }
}

/// One named generative operation: input shape, output shape, prompt template.
///
/// Definitions are built at startup, registered once, and never mutated.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    /// Unique flow name; doubles as the feature identifier for gating.
    pub name: String,
    /// Shape the caller's input must conform to before rendering.
    pub input_schema: Schema,
    /// Shape the model's response is normalized against.
    pub output_schema: Schema,
    /// Opaque minijinja template rendered with the validated input.
    pub prompt_template: String,
    /// Optional per-flow sampling overrides.
    pub model_config: Option<ModelConfig>,
}

impl FlowDefinition {
    /// Define a flow with provider-default model settings.
    pub fn new(
        name: impl Into<String>,
        input_schema: Schema,
        output_schema: Schema,
        prompt_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_schema,
            output_schema,
            prompt_template: prompt_template.into(),
            model_config: None,
        }
    }

    /// Attach sampling overrides.
    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = Some(config);
        self
    }
}
