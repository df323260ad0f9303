use std::sync::Arc;

use weft_ai::Message;

use crate::directive::DirectiveRegistry;
use crate::error::EngineError;
use crate::pattern::Pattern;
use crate::request::ChatRequest;
use crate::session::Session;
use crate::template::{render, TemplateContext};

/// Builds the ordered message list for one turn.
///
/// System text is context, pattern, strategy in that order with empty
/// segments omitted; a language directive sentence goes last so pattern
/// content cannot override it. System and user text render independently
/// with `{{input}}` bound to the user input. Raw mode folds both into a
/// single user message for vendors that reject a system role.
pub fn build_session(
    request: &ChatRequest,
    pattern: &Pattern,
    context_text: &str,
    strategy_text: &str,
    prior: Option<Session>,
    vendor_requires_raw: bool,
    directives: &Arc<DirectiveRegistry>,
) -> Result<Session, EngineError> {
    let mut segments: Vec<&str> = Vec::new();
    if !context_text.is_empty() {
        segments.push(context_text);
    }
    if !pattern.text.is_empty() {
        segments.push(&pattern.text);
    }
    if !strategy_text.is_empty() {
        segments.push(strategy_text);
    }
    let mut system_text = segments.join("\n");

    let language_sentence = request
        .language
        .as_deref()
        .filter(|language| !language.is_empty())
        .map(|language| format!("Use the language '{language}' for the entire response."));
    if let Some(sentence) = language_sentence {
        if !system_text.is_empty() {
            system_text.push('\n');
        }
        system_text.push_str(&sentence);
    }

    let template_ctx = TemplateContext::new(Arc::clone(directives))
        .with_variables(request.variables.clone())
        .with_input(request.input.clone());
    let rendered_system = render(&system_text, &template_ctx)?;
    let rendered_user = render(&request.input, &template_ctx)?;

    let mut session = match prior {
        Some(prior) => prior,
        None => match &request.session {
            Some(name) => Session::named(name.clone()),
            None => Session::anonymous(),
        },
    };

    if request.raw || request.options.raw || vendor_requires_raw {
        let merged = if rendered_system.is_empty() {
            rendered_user
        } else {
            format!("{rendered_system}\n\n{rendered_user}")
        };
        session.append(Message::user(merged));
    } else {
        session.append(Message::system(rendered_system));
        session.append(Message::user(rendered_user));
    }

    Ok(session)
}
