use handlebars::Handlebars;
use serde::Serialize;

use crate::error::PipelineError;

const TEMPLATE_NAME: &str = "message";

/// Render a rule template against a context value.
///
/// A pure function of its inputs: every call compiles the source into
/// a fresh strict-mode registry with no helpers or partials, so a
/// template can interpolate context fields and nothing else. Strict
/// mode turns an undefined field into a render failure instead of an
/// empty string.
pub fn render<C: Serialize>(source: &str, context: &C) -> Result<String, PipelineError> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(handlebars::no_escape);
    registry.register_template_string(TEMPLATE_NAME, source)?;
    Ok(registry.render(TEMPLATE_NAME, context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        username: String,
        id: u64,
    }

    fn sample() -> Sample {
        Sample {
            username: "ada".to_string(),
            id: 7,
        }
    }

    #[test]
    fn renders_field_interpolation() {
        let out = render("{{username}} -> {{id}}", &sample()).unwrap();
        assert_eq!(out, "ada -> 7");
    }

    #[test]
    fn renders_literal_text_unchanged() {
        let out = render("it's a <plain> string", &sample()).unwrap();
        assert_eq!(out, "it's a <plain> string");
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let err = render("{{username", &sample()).unwrap_err();
        assert!(matches!(err, PipelineError::TemplateParse(_)));
    }

    #[test]
    fn undefined_field_is_a_render_error() {
        let err = render("{{missing_field}}", &sample()).unwrap_err();
        assert!(matches!(err, PipelineError::TemplateRender(_)));
    }

    #[test]
    fn empty_source_renders_empty() {
        assert_eq!(render("", &sample()).unwrap(), "");
    }
}
