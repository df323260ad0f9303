use std::env;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use super::{join_url, shared_http_client};
use crate::client::{VendorClient, VendorFuture, VendorStreamReceiver};
use crate::error::{AiError, AiErrorCode};
use crate::types::{
    ChatOptions, Message, Role, StreamChunk, VendorCapabilities, VendorDescriptor,
    VendorStreamItem,
};

/// Client for OpenAI-compatible chat-completions endpoints. This is the
/// only wire protocol in the tree; everything else talks to the
/// `VendorClient` contract.
#[derive(Clone)]
pub struct OpenAiCompatVendor {
    name: String,
    base_url: String,
    api_key_env: String,
    models: Vec<String>,
    capabilities: VendorCapabilities,
}

impl OpenAiCompatVendor {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
            models: vec![],
            capabilities: VendorCapabilities {
                streaming: true,
                raw_mode: false,
                thinking: true,
            },
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

    fn api_key(&self) -> Result<String, AiError> {
        match env::var(&self.api_key_env) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(AiError::new(
                AiErrorCode::VendorFailure,
                format!(
                    "missing API key for vendor '{}': set {}",
                    self.name, self.api_key_env
                ),
            )),
        }
    }
}

impl VendorClient for OpenAiCompatVendor {
    fn descriptor(&self) -> VendorDescriptor {
        VendorDescriptor {
            name: self.name.clone(),
            models: self.models.clone(),
            capabilities: self.capabilities,
        }
    }

    fn is_configured(&self) -> bool {
        env::var(&self.api_key_env)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    fn send(&self, messages: Vec<Message>, options: ChatOptions) -> VendorFuture<String> {
        let vendor = self.clone();
        Box::pin(async move {
            let api_key = vendor.api_key()?;
            let payload = build_chat_payload(&messages, &options, false);
            let endpoint = join_url(&vendor.base_url, "chat/completions");
            debug!(vendor = %vendor.name, %endpoint, "chat completion request");

            let response = shared_http_client(&vendor.base_url)
                .post(&endpoint)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&payload)
                .send()
                .await
                .map_err(|error| transport_error(&vendor.name, error))?;

            if !response.status().is_success() {
                return Err(http_error(&vendor.name, response.status(), response).await);
            }

            let body: Value = response
                .json()
                .await
                .map_err(|error| transport_error(&vendor.name, error))?;
            let text = body
                .get("choices")
                .and_then(Value::as_array)
                .and_then(|choices| choices.first())
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(text.to_string())
        })
    }

    fn send_stream(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
    ) -> VendorFuture<VendorStreamReceiver> {
        let vendor = self.clone();
        Box::pin(async move {
            let api_key = vendor.api_key()?;
            let payload = build_chat_payload(&messages, &options, true);
            let endpoint = join_url(&vendor.base_url, "chat/completions");
            debug!(vendor = %vendor.name, %endpoint, "chat completion stream request");

            let response = shared_http_client(&vendor.base_url)
                .post(&endpoint)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&payload)
                .send()
                .await
                .map_err(|error| transport_error(&vendor.name, error))?;

            if !response.status().is_success() {
                return Err(http_error(&vendor.name, response.status(), response).await);
            }

            let (sender, receiver) = mpsc::unbounded_channel();
            let vendor_name = vendor.name.clone();
            tokio::spawn(async move {
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(error) => {
                        let _ = sender.send(VendorStreamItem::Error(transport_error(
                            &vendor_name,
                            error,
                        )));
                        return;
                    }
                };

                let mut seq = 0_u64;
                for data in sse_data_events(&body) {
                    if data == "[DONE]" {
                        break;
                    }

                    let chunk: Value = match serde_json::from_str(&data) {
                        Ok(chunk) => chunk,
                        Err(error) => {
                            let _ = sender.send(VendorStreamItem::Error(
                                AiError::new(
                                    AiErrorCode::VendorFailure,
                                    format!("invalid stream chunk JSON: {error}"),
                                )
                                .with_details(json!({ "chunk": data })),
                            ));
                            return;
                        }
                    };

                    let delta = chunk
                        .get("choices")
                        .and_then(Value::as_array)
                        .and_then(|choices| choices.first())
                        .and_then(|choice| choice.get("delta"))
                        .and_then(|delta| delta.get("content"))
                        .and_then(Value::as_str)
                        .unwrap_or_default();

                    if !delta.is_empty() {
                        let _ = sender.send(VendorStreamItem::Chunk(StreamChunk {
                            seq,
                            text: delta.to_string(),
                        }));
                        seq += 1;
                    }
                }
                let _ = sender.send(VendorStreamItem::Done);
            });

            Ok(receiver)
        })
    }

    fn list_models(&self) -> VendorFuture<Vec<String>> {
        let vendor = self.clone();
        Box::pin(async move {
            let api_key = vendor.api_key()?;
            let endpoint = join_url(&vendor.base_url, "models");

            let response = shared_http_client(&vendor.base_url)
                .get(&endpoint)
                .header("Authorization", format!("Bearer {api_key}"))
                .send()
                .await
                .map_err(|error| transport_error(&vendor.name, error))?;

            if !response.status().is_success() {
                return Err(http_error(&vendor.name, response.status(), response).await);
            }

            let body: Value = response
                .json()
                .await
                .map_err(|error| transport_error(&vendor.name, error))?;
            let models = body
                .get("data")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| entry.get("id").and_then(Value::as_str))
                        .map(ToOwned::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            Ok(models)
        })
    }
}

fn build_chat_payload(messages: &[Message], options: &ChatOptions, stream: bool) -> Value {
    let converted: Vec<Value> = messages
        .iter()
        .map(|message| {
            json!({
                "role": match message.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": message.content,
            })
        })
        .collect();

    let mut payload = json!({
        "model": options.model.clone().unwrap_or_default(),
        "stream": stream,
        "messages": converted,
    });
    if let Some(temperature) = options.temperature {
        payload["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = options.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    payload
}

fn transport_error(vendor: &str, error: impl std::fmt::Display) -> AiError {
    AiError::new(
        AiErrorCode::VendorFailure,
        format!("{vendor} transport failed: {error}"),
    )
}

async fn http_error(vendor: &str, status: reqwest::StatusCode, response: reqwest::Response) -> AiError {
    let status = status.as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());
    AiError::new(
        AiErrorCode::VendorFailure,
        format!("{vendor} HTTP {status}: {body}"),
    )
}

/// Splits an SSE body into its `data:` payloads. Blank lines delimit
/// events; an event's multiple data lines are joined with newlines.
/// Non-data fields (comments, `event:`, `id:`) are skipped.
fn sse_data_events(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !current.is_empty() {
                events.push(current.join("\n"));
                current.clear();
            }
        } else if let Some(data) = line.strip_prefix("data:") {
            current.push(data.trim_start());
        }
    }
    if !current.is_empty() {
        events.push(current.join("\n"));
    }
    events
}
