use std::collections::HashMap;

use crate::domain::error::FlowError;
use crate::domain::flow::FlowDefinition;
use crate::domain::schema::verify_schema;

/// Immutable-after-startup catalog of flow definitions.
///
/// An explicit object constructed at startup and injected into the executor;
/// there is no ambient global registry. Registration validates schema
/// well-formedness so malformed wiring fails at startup, not mid-call.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: HashMap<String, FlowDefinition>,
}

impl FlowRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow definition.
    ///
    /// Fails with `DuplicateFlow` if the name is taken, or `Configuration`
    /// if either schema is malformed (e.g. a default that does not match its
    /// field's kind).
    pub fn register(&mut self, flow: FlowDefinition) -> Result<(), FlowError> {
        verify_schema(&flow.input_schema, "").map_err(|reason| {
            FlowError::Configuration(format!("flow '{}' input schema: {reason}", flow.name))
        })?;
        verify_schema(&flow.output_schema, "").map_err(|reason| {
            FlowError::Configuration(format!("flow '{}' output schema: {reason}", flow.name))
        })?;
        if self.flows.contains_key(&flow.name) {
            return Err(FlowError::DuplicateFlow(flow.name));
        }
        self.flows.insert(flow.name.clone(), flow);
        Ok(())
    }

    /// Look up a registered flow definition.
    pub fn lookup(&self, name: &str) -> Result<&FlowDefinition, FlowError> {
        self.flows.get(name).ok_or_else(|| FlowError::UnknownFlow(name.to_string()))
    }

    /// Names of all registered flows, in no particular order.
    pub fn flow_names(&self) -> impl Iterator<Item = &str> {
        self.flows.keys().map(String::as_str)
    }

    /// Number of registered flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Whether no flows are registered.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{FieldSchema, Schema};

    fn minimal_flow(name: &str) -> FlowDefinition {
        let mut input = Schema::new();
        input.insert("topic".into(), FieldSchema::string());
        let mut output = Schema::new();
        output.insert("summary".into(), FieldSchema::string());
        FlowDefinition::new(name, input, output, "Summarize {{ topic }}.")
    }

    #[test]
    fn register_then_lookup_returns_definition() {
        let mut registry = FlowRegistry::new();
        registry.register(minimal_flow("summarize")).unwrap();
        let flow = registry.lookup("summarize").unwrap();
        assert_eq!(flow.name, "summarize");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = FlowRegistry::new();
        registry.register(minimal_flow("summarize")).unwrap();
        let err = registry.register(minimal_flow("summarize")).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateFlow(name) if name == "summarize"));
    }

    #[test]
    fn unknown_lookup_is_rejected() {
        let registry = FlowRegistry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, FlowError::UnknownFlow(name) if name == "missing"));
    }

    #[test]
    fn malformed_schema_fails_registration() {
        let mut registry = FlowRegistry::new();
        let mut output = Schema::new();
        output.insert("score".into(), FieldSchema::integer().with_default("high"));
        let flow = FlowDefinition::new("bad", Schema::new(), output, "irrelevant");
        let err = registry.register(flow).unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
    }
}
