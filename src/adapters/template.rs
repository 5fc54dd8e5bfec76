//! Prompt rendering via minijinja.

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;

use crate::domain::{Record, RenderError, TemplateRenderer};

/// Template renderer backed by minijinja.
///
/// Undefined behavior is lenient: a placeholder whose field is absent from
/// the input renders as the empty string instead of failing, so templates may
/// reference optional fields freely. Only genuine syntax errors surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaRenderer;

impl MiniJinjaRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, template: &str, input: &Record, flow: &str) -> Result<String, RenderError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        let context = minijinja::Value::from_serialize(&Value::Object(input.clone()));
        env.render_str(template, context)
            .map_err(|e| RenderError { flow: flow.to_string(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn substitutes_scalar_placeholders() {
        let renderer = MiniJinjaRenderer::new();
        let input = record(json!({ "coinName": "Dogecoin" }));
        let out = renderer.render("Signal for {{ coinName }}.", &input, "test").unwrap();
        assert_eq!(out, "Signal for Dogecoin.");
    }

    #[test]
    fn absent_placeholder_renders_as_empty_string() {
        let renderer = MiniJinjaRenderer::new();
        let out = renderer.render("Hello {{ missing }}!", &Record::new(), "test").unwrap();
        assert_eq!(out, "Hello !");
    }

    #[test]
    fn conditional_sections_skip_absent_fields() {
        let renderer = MiniJinjaRenderer::new();
        let template = "Base.{% if note %} Note: {{ note }}{% endif %}";
        let with = record(json!({ "note": "ape carefully" }));
        assert_eq!(renderer.render(template, &with, "test").unwrap(), "Base. Note: ape carefully");
        assert_eq!(renderer.render(template, &Record::new(), "test").unwrap(), "Base.");
    }

    #[test]
    fn iterates_simple_lists() {
        let renderer = MiniJinjaRenderer::new();
        let template = "{% for h in holdings %}{{ h.coinName }};{% endfor %}";
        let input = record(json!({
            "holdings": [{ "coinName": "DOGE" }, { "coinName": "PEPE" }]
        }));
        assert_eq!(renderer.render(template, &input, "test").unwrap(), "DOGE;PEPE;");
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = MiniJinjaRenderer::new();
        let input = record(json!({ "coinName": "Shiba" }));
        let first = renderer.render("{{ coinName }}!", &input, "test").unwrap();
        let second = renderer.render("{{ coinName }}!", &input, "test").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn syntax_error_is_reported_with_flow_name() {
        let renderer = MiniJinjaRenderer::new();
        let err = renderer.render("{% if %}", &Record::new(), "getCoinTradingSignal").unwrap_err();
        assert_eq!(err.flow, "getCoinTradingSignal");
        assert!(!err.reason.is_empty());
    }
}
