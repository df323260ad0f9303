use std::collections::HashMap;

use weft_ai::ChatOptions;

/// Immutable description of one orchestration invocation. Caller-owned
/// and read-only to the engine.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub pattern: Option<String>,
    pub input: String,
    pub context: Option<String>,
    pub session: Option<String>,
    pub strategy: Option<String>,
    pub language: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub stream: bool,
    pub raw: bool,
    pub variables: HashMap<String, String>,
    pub options: ChatOptions,
}

impl ChatRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn raw_mode(mut self) -> Self {
        self.raw = true;
        self
    }
}
