use serde::{Deserialize, Serialize};

use crate::error::AiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatOptions {
    /// Model identifier the call should request, filled in by selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub raw: bool,
    #[serde(rename = "suppressThinking", default)]
    pub suppress_thinking: bool,
    #[serde(rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCapabilities {
    pub streaming: bool,
    #[serde(rename = "rawMode")]
    pub raw_mode: bool,
    pub thinking: bool,
}

impl Default for VendorCapabilities {
    fn default() -> Self {
        Self {
            streaming: true,
            raw_mode: false,
            thinking: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorDescriptor {
    pub name: String,
    pub models: Vec<String>,
    pub capabilities: VendorCapabilities,
}

impl VendorDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            models: vec![],
            capabilities: VendorCapabilities::default(),
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_capabilities(mut self, capabilities: VendorCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn serves_model(&self, model: &str) -> bool {
        self.models.iter().any(|candidate| candidate == model)
    }
}

/// Ordered fragment of assistant text. Sequence numbers reflect vendor
/// production order; a chunk boundary may split multi-byte or multi-line
/// content and must pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub seq: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "chunk")]
    Chunk(StreamChunk),
    #[serde(rename = "done")]
    Done { text: String },
    #[serde(rename = "error")]
    Error(AiError),
}

/// What a vendor task sends on its internal channel while a stream is live.
#[derive(Debug, Clone, PartialEq)]
pub enum VendorStreamItem {
    Chunk(StreamChunk),
    Done,
    Error(AiError),
}
