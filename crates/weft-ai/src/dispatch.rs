use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::abort::AbortSignal;
use crate::client::VendorClientRef;
use crate::error::{AiError, AiErrorCode};
use crate::event_stream::ChatEventStream;
use crate::thinking::{strip_thinking, ThinkingFilter};
use crate::types::{ChatOptions, Message, StreamChunk, StreamEvent, VendorStreamItem};

/// Single blocking vendor call. The reply is normalized into one
/// assistant message; a zero-length reply (including one that stripped
/// down to nothing) is an error, never a silent success.
pub async fn send(
    client: VendorClientRef,
    messages: Vec<Message>,
    options: ChatOptions,
    signal: Option<AbortSignal>,
) -> Result<Message, AiError> {
    let timeout = options.timeout_ms.map(Duration::from_millis);
    let suppress = options.suppress_thinking;
    let call = client.send(messages, options);

    let text = match (timeout, signal) {
        (Some(deadline), Some(signal)) => tokio::select! {
            outcome = tokio::time::timeout(deadline, call) => flatten_timeout(outcome)?,
            _ = signal.cancelled() => return Err(aborted_error()),
        },
        (Some(deadline), None) => flatten_timeout(tokio::time::timeout(deadline, call).await)?,
        (None, Some(signal)) => tokio::select! {
            outcome = call => outcome?,
            _ = signal.cancelled() => return Err(aborted_error()),
        },
        (None, None) => call.await?,
    };

    let text = if suppress { strip_thinking(&text) } else { text };
    if text.is_empty() {
        return Err(AiError::new(
            AiErrorCode::EmptyResponse,
            "vendor returned zero-length content",
        ));
    }

    Ok(Message::assistant(text))
}

/// Streamed vendor call. Chunks are relayed to the returned stream in
/// arrival order while the same chunks feed an accumulator; the terminal
/// event is either `done` with the full text or a stream interrupt. The
/// relay task is the stream's only producer.
pub fn send_stream(
    client: VendorClientRef,
    messages: Vec<Message>,
    options: ChatOptions,
    signal: Option<AbortSignal>,
) -> ChatEventStream {
    let stream = ChatEventStream::new();
    let relay = stream.clone();
    let suppress = options.suppress_thinking;

    spawn_relay_task(async move {
        let mut receiver = match client.send_stream(messages, options).await {
            Ok(receiver) => receiver,
            Err(error) => {
                relay.push(StreamEvent::Error(interrupted(error)));
                relay.close();
                return;
            }
        };

        let mut filter = suppress.then(ThinkingFilter::new);
        let mut accumulated = String::new();
        let mut last_seq = None;

        loop {
            let item = match &signal {
                Some(signal) => tokio::select! {
                    item = receiver.recv() => item,
                    _ = signal.cancelled() => {
                        relay.push(StreamEvent::Error(aborted_error()));
                        relay.close();
                        return;
                    }
                },
                None => receiver.recv().await,
            };

            match item {
                Some(VendorStreamItem::Chunk(chunk)) => {
                    let visible = match filter.as_mut() {
                        Some(filter) => filter.push(&chunk.text),
                        None => chunk.text,
                    };
                    if visible.is_empty() {
                        continue;
                    }
                    accumulated.push_str(&visible);
                    last_seq = Some(chunk.seq);
                    relay.push(StreamEvent::Chunk(StreamChunk {
                        seq: chunk.seq,
                        text: visible,
                    }));
                }
                Some(VendorStreamItem::Done) => {
                    if let Some(filter) = filter.as_mut() {
                        // Held-back text that never became a delimiter is
                        // still part of the reply; relay it so chunk
                        // concatenation matches the final text.
                        let tail = filter.finish();
                        if !tail.is_empty() {
                            accumulated.push_str(&tail);
                            relay.push(StreamEvent::Chunk(StreamChunk {
                                seq: last_seq.map_or(0, |seq| seq + 1),
                                text: tail,
                            }));
                        }
                    }
                    debug!(length = accumulated.len(), "stream completed");
                    relay.push(StreamEvent::Done { text: accumulated });
                    relay.close();
                    return;
                }
                Some(VendorStreamItem::Error(error)) => {
                    relay.push(StreamEvent::Error(interrupted(error)));
                    relay.close();
                    return;
                }
                None => {
                    // Vendor dropped its sender without signaling
                    // completion; the caller must not mistake this for a
                    // clean end.
                    relay.push(StreamEvent::Error(AiError::new(
                        AiErrorCode::StreamInterrupted,
                        "vendor stream ended without completion",
                    )));
                    relay.close();
                    return;
                }
            }
        }
    });

    stream
}

fn interrupted(inner: AiError) -> AiError {
    if inner.code == AiErrorCode::Aborted {
        return inner;
    }
    AiError::new(AiErrorCode::StreamInterrupted, inner.message.clone())
        .with_details(json!({ "cause": inner.code }))
}

fn aborted_error() -> AiError {
    AiError::new(AiErrorCode::Aborted, "dispatch cancelled by caller")
}

fn flatten_timeout<T>(
    outcome: Result<Result<T, AiError>, tokio::time::error::Elapsed>,
) -> Result<T, AiError> {
    match outcome {
        Ok(inner) => inner,
        Err(_) => Err(AiError::new(
            AiErrorCode::VendorFailure,
            "vendor call exceeded deadline",
        )),
    }
}

fn spawn_relay_task<F>(task: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(task);
        return;
    }

    std::thread::spawn(move || {
        if let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            runtime.block_on(task);
        }
    });
}
