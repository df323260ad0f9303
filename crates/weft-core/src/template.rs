use std::collections::HashMap;
use std::sync::Arc;

use crate::directive::DirectiveRegistry;
use crate::error::EngineError;

pub const INPUT_VARIABLE: &str = "input";

/// Per-request substitution context: a variable mapping plus the
/// directive registry. Built fresh for each render, never mutated after
/// construction.
#[derive(Clone)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
    directives: Arc<DirectiveRegistry>,
}

impl TemplateContext {
    pub fn new(directives: Arc<DirectiveRegistry>) -> Self {
        Self {
            variables: HashMap::new(),
            directives,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_input(self, input: impl Into<String>) -> Self {
        self.with_variable(INPUT_VARIABLE, input)
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }
}

/// Single-pass `{{name}}` substitution. Bound variables are replaced
/// everywhere they occur; an unbound placeholder stays verbatim as a
/// caller-visible signal of missing input. `{{plugin:name:args}}` goes
/// through the directive registry and an unknown directive fails the
/// whole render. Substituted values are never re-scanned, so a value
/// containing placeholder syntax cannot trigger further expansion.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String, EngineError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            // Unterminated marker: not a placeholder, emit as-is.
            output.push_str(&rest[start..]);
            return Ok(output);
        };

        let token = &after_open[..end];
        match token.strip_prefix("plugin:") {
            Some(invocation) => {
                let (name, args) = invocation.split_once(':').unwrap_or((invocation, ""));
                output.push_str(&ctx.directives().resolve(name, args)?);
            }
            None => match ctx.variable(token) {
                Some(value) => output.push_str(value),
                None => {
                    output.push_str("{{");
                    output.push_str(token);
                    output.push_str("}}");
                }
            },
        }

        rest = &after_open[end + 2..];
    }

    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext::new(Arc::new(DirectiveRegistry::builtin()))
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let text = "You are a helpful assistant.\nBe brief.";
        assert_eq!(render(text, &ctx()).unwrap(), text);
    }

    #[test]
    fn bound_variable_is_substituted_at_every_occurrence() {
        let context = ctx().with_input("hello");
        let rendered = render("A: {{input}} B: {{input}}", &context).unwrap();
        assert_eq!(rendered, "A: hello B: hello");
    }

    #[test]
    fn unbound_variable_stays_verbatim() {
        let rendered = render("value = {{missing}}", &ctx()).unwrap();
        assert_eq!(rendered, "value = {{missing}}");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let context = ctx().with_variable("a", "{{b}}").with_variable("b", "boom");
        let rendered = render("{{a}}", &context).unwrap();
        assert_eq!(rendered, "{{b}}");
    }

    #[test]
    fn unknown_directive_fails_without_partial_output() {
        let result = render("before {{plugin:nope:}} after", &ctx());
        assert!(matches!(
            result,
            Err(EngineError::UnknownDirective(name)) if name == "nope"
        ));
    }

    #[test]
    fn directive_output_is_inlined() {
        let context = ctx();
        let rendered = render("shout: {{plugin:text:upper:hi}}", &context).unwrap();
        assert_eq!(rendered, "shout: HI");
    }

    #[test]
    fn unterminated_marker_is_plain_text() {
        let rendered = render("left {{input", &ctx()).unwrap();
        assert_eq!(rendered, "left {{input");
    }

    #[test]
    fn empty_template_renders_empty() {
        assert_eq!(render("", &ctx()).unwrap(), "");
    }
}
