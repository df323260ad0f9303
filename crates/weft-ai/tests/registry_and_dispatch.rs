use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use weft_ai::{
    send, send_stream, AbortController, AiError, AiErrorCode, ChatOptions, ClosureVendorClient,
    Message, StreamChunk, StreamEvent, VendorDescriptor, VendorRegistry, VendorStreamItem,
};

fn descriptor(name: &str, models: &[&str]) -> VendorDescriptor {
    VendorDescriptor::new(name).with_models(models.iter().map(ToString::to_string).collect())
}

fn echo_client(name: &str, models: &[&str], reply: &str) -> Arc<ClosureVendorClient> {
    let reply = reply.to_string();
    let mut client = ClosureVendorClient::unreachable(descriptor(name, models));
    client.send = Arc::new(move |_, _| {
        let reply = reply.clone();
        Box::pin(async move { Ok(reply) })
    });
    Arc::new(client)
}

fn scripted_stream_client(
    name: &str,
    items: Vec<VendorStreamItem>,
) -> Arc<ClosureVendorClient> {
    let mut client = ClosureVendorClient::unreachable(descriptor(name, &["m"]));
    client.send_stream = Arc::new(move |_, _| {
        let items = items.clone();
        Box::pin(async move {
            let (sender, receiver) = mpsc::unbounded_channel();
            for item in items {
                let _ = sender.send(item);
            }
            Ok(receiver)
        })
    });
    client
        .into()
}

fn chunk(seq: u64, text: &str) -> VendorStreamItem {
    VendorStreamItem::Chunk(StreamChunk {
        seq,
        text: text.to_string(),
    })
}

#[tokio::test]
async fn empty_registry_yields_no_vendors_configured() {
    let registry = VendorRegistry::new();
    let error = registry.select(None, None).await.unwrap_err();
    assert_eq!(error.code, AiErrorCode::NoVendorsConfigured);
}

#[tokio::test]
async fn unconfigured_vendors_never_appear_as_targets() {
    let registry = VendorRegistry::new();
    let mut unready = ClosureVendorClient::unreachable(descriptor("down", &["m1"]));
    unready.configured = false;
    registry.register(Arc::new(unready));

    let error = registry.select(None, None).await.unwrap_err();
    assert_eq!(error.code, AiErrorCode::NoVendorsConfigured);

    let error = registry.select(None, Some("down")).await.unwrap_err();
    assert_eq!(error.code, AiErrorCode::VendorNotConfigured);
}

#[tokio::test]
async fn vendor_hint_on_empty_registry_names_the_missing_vendor() {
    let registry = VendorRegistry::new();
    let error = registry.select(None, Some("ghost")).await.unwrap_err();
    assert_eq!(error.code, AiErrorCode::VendorNotConfigured);
}

#[tokio::test]
async fn selection_debug_names_vendor_and_model() {
    let registry = VendorRegistry::new();
    registry.register(echo_client("local", &["m1"], "x"));

    let selection = registry
        .select(Some("m1"), None)
        .await
        .expect("selection should succeed");
    let rendered = format!("{selection:?}");
    assert!(rendered.contains("local"), "got {rendered}");
    assert!(rendered.contains("m1"), "got {rendered}");
}

#[tokio::test]
async fn model_hint_matches_by_registration_order() {
    let registry = VendorRegistry::new();
    registry.register(echo_client("first", &["shared-model"], "a"));
    registry.register(echo_client("second", &["shared-model"], "b"));

    let selection = registry
        .select(Some("shared-model"), None)
        .await
        .expect("selection should succeed");
    assert_eq!(selection.vendor, "first");
    assert_eq!(selection.model.as_deref(), Some("shared-model"));
}

#[tokio::test]
async fn unmatched_model_hint_is_never_silently_replaced() {
    let registry = VendorRegistry::new();
    registry.register(echo_client("only", &["m1", "m2"], "x"));

    let error = registry.select(Some("nope"), None).await.unwrap_err();
    assert_eq!(error.code, AiErrorCode::ModelNotAvailable);
}

#[tokio::test]
async fn model_hint_falls_back_to_live_discovery() {
    let registry = VendorRegistry::new();
    let mut client = ClosureVendorClient::unreachable(descriptor("dynamic", &[]));
    client.list_models = Arc::new(|| {
        Box::pin(async { Ok(vec!["runtime-model".to_string()]) })
    });
    registry.register(Arc::new(client));

    let selection = registry
        .select(Some("runtime-model"), None)
        .await
        .expect("discovered model should select");
    assert_eq!(selection.vendor, "dynamic");
}

#[tokio::test]
async fn default_pair_is_used_without_hints() {
    let registry = VendorRegistry::new();
    registry.register(echo_client("alpha", &["a1"], "x"));
    registry.register(echo_client("beta", &["b1"], "y"));
    registry.set_default("beta", "b1");

    let selection = registry.select(None, None).await.expect("default selection");
    assert_eq!(selection.vendor, "beta");
    assert_eq!(selection.model.as_deref(), Some("b1"));
}

#[tokio::test]
async fn discovery_isolates_failing_vendors() {
    let registry = VendorRegistry::new().with_model_list_timeout(Duration::from_millis(200));

    let mut failing = ClosureVendorClient::unreachable(descriptor("broken", &[]));
    failing.list_models = Arc::new(|| {
        Box::pin(async {
            Err(AiError::new(
                AiErrorCode::VendorFailure,
                "listing exploded",
            ))
        })
    });
    let mut slow = ClosureVendorClient::unreachable(descriptor("slow", &[]));
    slow.list_models = Arc::new(|| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec!["never".to_string()])
        })
    });
    let mut healthy = ClosureVendorClient::unreachable(descriptor("healthy", &[]));
    healthy.list_models =
        Arc::new(|| Box::pin(async { Ok(vec!["h1".to_string(), "h2".to_string()]) }));

    registry.register(Arc::new(failing));
    registry.register(Arc::new(slow));
    registry.register(Arc::new(healthy));

    let discovered = registry.discover_models().await;
    assert_eq!(discovered.len(), 3);
    assert!(discovered[0].models.is_empty());
    assert!(discovered[1].models.is_empty());
    assert_eq!(discovered[2].models, vec!["h1", "h2"]);
}

#[tokio::test]
async fn send_returns_single_assistant_message() {
    let client = echo_client("v", &["m"], "the reply");
    let reply = send(
        client,
        vec![Message::user("hi")],
        ChatOptions::default(),
        None,
    )
    .await
    .expect("send should succeed");
    assert_eq!(reply.content, "the reply");
}

#[tokio::test]
async fn empty_reply_is_reported_not_swallowed() {
    let client = echo_client("v", &["m"], "");
    let error = send(
        client,
        vec![Message::user("hi")],
        ChatOptions::default(),
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(error.code, AiErrorCode::EmptyResponse);
}

#[tokio::test]
async fn send_strips_thinking_when_suppressed() {
    let client = echo_client("v", &["m"], "<think>scratch</think>naïve answer");
    let options = ChatOptions {
        suppress_thinking: true,
        ..ChatOptions::default()
    };
    let reply = send(client, vec![Message::user("hi")], options, None)
        .await
        .expect("send should succeed");
    assert_eq!(reply.content, "naïve answer");
}

#[tokio::test]
async fn reply_that_is_all_thinking_counts_as_empty() {
    let client = echo_client("v", &["m"], "<think>only private text</think>");
    let options = ChatOptions {
        suppress_thinking: true,
        ..ChatOptions::default()
    };
    let error = send(client, vec![Message::user("hi")], options, None)
        .await
        .unwrap_err();
    assert_eq!(error.code, AiErrorCode::EmptyResponse);
}

#[tokio::test]
async fn stream_relays_chunks_in_order_and_aggregates() {
    let client = scripted_stream_client(
        "v",
        vec![chunk(0, "Hel"), chunk(1, "lo"), VendorStreamItem::Done],
    );

    let stream = send_stream(client, vec![Message::user("hi")], ChatOptions::default(), None);

    let mut relayed = Vec::new();
    while let Some(event) = stream.next().await {
        relayed.push(event);
    }

    assert_eq!(relayed.len(), 3);
    assert_eq!(
        relayed[0],
        StreamEvent::Chunk(StreamChunk {
            seq: 0,
            text: "Hel".to_string()
        })
    );
    assert_eq!(
        relayed[1],
        StreamEvent::Chunk(StreamChunk {
            seq: 1,
            text: "lo".to_string()
        })
    );
    assert_eq!(
        relayed[2],
        StreamEvent::Done {
            text: "Hello".to_string()
        }
    );
    assert_eq!(stream.result().await, Some(Ok("Hello".to_string())));
}

#[tokio::test]
async fn stream_error_follows_relayed_chunks_without_done() {
    let client = scripted_stream_client(
        "v",
        vec![
            chunk(0, "partial"),
            VendorStreamItem::Error(AiError::new(AiErrorCode::VendorFailure, "connection reset")),
        ],
    );

    let stream = send_stream(client, vec![Message::user("hi")], ChatOptions::default(), None);

    let first = stream.next().await.expect("chunk event");
    assert!(matches!(first, StreamEvent::Chunk(_)));
    let second = stream.next().await.expect("error event");
    match second {
        StreamEvent::Error(error) => assert_eq!(error.code, AiErrorCode::StreamInterrupted),
        other => panic!("expected error event, got {other:?}"),
    }
    assert_eq!(stream.next().await, None);

    let result = stream.result().await.expect("terminal result");
    assert_eq!(result.unwrap_err().code, AiErrorCode::StreamInterrupted);
}

#[tokio::test]
async fn dropped_vendor_sender_is_an_interrupt() {
    let client = scripted_stream_client("v", vec![chunk(0, "only")]);

    let stream = send_stream(client, vec![Message::user("hi")], ChatOptions::default(), None);
    stream.next().await;
    match stream.next().await {
        Some(StreamEvent::Error(error)) => {
            assert_eq!(error.code, AiErrorCode::StreamInterrupted)
        }
        other => panic!("expected interrupt, got {other:?}"),
    }
}

#[tokio::test]
async fn abort_is_distinguishable_from_vendor_failure() {
    // Stream that stays open until the harness aborts it.
    let mut client = ClosureVendorClient::unreachable(descriptor("v", &["m"]));
    client.send_stream = Arc::new(|_, _| {
        Box::pin(async {
            let (sender, receiver) = mpsc::unbounded_channel();
            let _ = sender.send(VendorStreamItem::Chunk(StreamChunk {
                seq: 0,
                text: "begin".to_string(),
            }));
            tokio::spawn(async move {
                // Hold the sender open; the consumer cancels first.
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(sender);
            });
            Ok(receiver)
        })
    });

    let controller = AbortController::new();
    let stream = send_stream(
        Arc::new(client),
        vec![Message::user("hi")],
        ChatOptions::default(),
        Some(controller.signal()),
    );

    let first = stream.next().await.expect("first chunk");
    assert!(matches!(first, StreamEvent::Chunk(_)));

    controller.abort();
    match stream.next().await {
        Some(StreamEvent::Error(error)) => assert!(error.is_aborted()),
        other => panic!("expected aborted event, got {other:?}"),
    }
}

#[tokio::test]
async fn suppressed_thinking_never_leaks_across_chunk_splits() {
    let client = scripted_stream_client(
        "v",
        vec![
            chunk(0, "Answer: <thi"),
            chunk(1, "nk>hidden reasoning</th"),
            chunk(2, "ink>42"),
            VendorStreamItem::Done,
        ],
    );

    let options = ChatOptions {
        suppress_thinking: true,
        ..ChatOptions::default()
    };
    let stream = send_stream(client, vec![Message::user("hi")], options, None);

    let mut seen = String::new();
    let mut done_text = None;
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Chunk(chunk) => {
                assert!(!chunk.text.contains("hidden"));
                seen.push_str(&chunk.text);
            }
            StreamEvent::Done { text } => done_text = Some(text),
            StreamEvent::Error(error) => panic!("unexpected error: {error}"),
        }
    }

    assert_eq!(seen, "Answer: 42");
    assert_eq!(done_text.as_deref(), Some("Answer: 42"));
}

#[tokio::test]
async fn held_back_tail_is_relayed_before_done() {
    // "<t" looks like the start of a delimiter until the stream ends;
    // once released it must reach chunk consumers, not just the total.
    let client = scripted_stream_client(
        "v",
        vec![chunk(0, "answer is <t"), VendorStreamItem::Done],
    );

    let options = ChatOptions {
        suppress_thinking: true,
        ..ChatOptions::default()
    };
    let stream = send_stream(client, vec![Message::user("hi")], options, None);

    let mut relayed = String::new();
    let mut done_text = None;
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Chunk(chunk) => relayed.push_str(&chunk.text),
            StreamEvent::Done { text } => done_text = Some(text),
            StreamEvent::Error(error) => panic!("unexpected error: {error}"),
        }
    }

    assert_eq!(relayed, "answer is <t");
    assert_eq!(done_text.as_deref(), Some("answer is <t"));
}
