use std::sync::Arc;

use tracing::debug;
use weft_ai::{
    AbortSignal, AiError, AiErrorCode, ChatEventStream, ChatOptions, Message, Selection,
    StreamChunk, StreamEvent, VendorRegistry,
};

use crate::assembler::build_session;
use crate::directive::DirectiveRegistry;
use crate::error::EngineError;
use crate::pattern::{PatternResolver, PatternStoreRef};
use crate::request::ChatRequest;
use crate::session::{Session, SessionStoreRef};

/// Completed turn: the session including the assistant reply, plus the
/// reply itself for callers that only want the text.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub session: Session,
    pub reply: Message,
}

/// In-flight streamed turn. Events arrive on `events`; `finish` waits
/// for the terminal event, closes the turn, and persists the session.
pub struct StreamingTurn {
    pub events: ChatEventStream,
    session: Session,
    sessions: Option<SessionStoreRef>,
}

impl StreamingTurn {
    /// Consumes the remaining stream and settles the turn. A session is
    /// only written back after a successful non-empty reply, so an
    /// interrupted or aborted stream leaves stored state untouched.
    pub async fn finish(mut self) -> Result<ChatTurn, EngineError> {
        let text = match self.events.result().await {
            Some(Ok(text)) => text,
            Some(Err(error)) => return Err(error.into()),
            None => {
                return Err(AiError::new(
                    AiErrorCode::StreamInterrupted,
                    "stream closed without a terminal event",
                )
                .into());
            }
        };
        if text.is_empty() {
            return Err(AiError::new(
                AiErrorCode::EmptyResponse,
                "vendor stream completed with zero-length content",
            )
            .into());
        }

        let reply = Message::assistant(text);
        self.session.close_turn(reply.clone());
        persist(&self.sessions, &self.session)?;
        Ok(ChatTurn {
            session: self.session,
            reply,
        })
    }
}

/// Front door of the engine. Owns pattern resolution, session storage,
/// the vendor registry, and the directive registry, and wires them into
/// single turns.
pub struct Orchestrator {
    patterns: PatternResolver,
    contexts: Option<PatternStoreRef>,
    strategies: Option<PatternStoreRef>,
    sessions: Option<SessionStoreRef>,
    vendors: Arc<VendorRegistry>,
    directives: Arc<DirectiveRegistry>,
}

impl Orchestrator {
    pub fn new(patterns: PatternResolver, vendors: Arc<VendorRegistry>) -> Self {
        Self {
            patterns,
            contexts: None,
            strategies: None,
            sessions: None,
            vendors,
            directives: Arc::new(DirectiveRegistry::builtin()),
        }
    }

    pub fn with_contexts(mut self, contexts: PatternStoreRef) -> Self {
        self.contexts = Some(contexts);
        self
    }

    pub fn with_strategies(mut self, strategies: PatternStoreRef) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn with_sessions(mut self, sessions: SessionStoreRef) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_directives(mut self, directives: Arc<DirectiveRegistry>) -> Self {
        self.directives = directives;
        self
    }

    pub fn patterns(&self) -> &PatternResolver {
        &self.patterns
    }

    pub fn vendors(&self) -> &Arc<VendorRegistry> {
        &self.vendors
    }

    pub fn sessions(&self) -> Option<&SessionStoreRef> {
        self.sessions.as_ref()
    }

    /// One blocking turn. Resolution failures surface before any vendor
    /// traffic; the session is only saved once the reply is in hand.
    pub async fn run(
        &self,
        request: &ChatRequest,
        signal: Option<AbortSignal>,
    ) -> Result<ChatTurn, EngineError> {
        let (selection, mut session, options) = self.prepare(request).await?;

        let reply =
            weft_ai::send(selection.client, session.messages.clone(), options, signal).await?;

        session.close_turn(reply.clone());
        persist(&self.sessions, &session)?;
        Ok(ChatTurn { session, reply })
    }

    /// One streamed turn. Vendors without streaming support are bridged
    /// through a blocking call replayed as a single chunk, so callers
    /// see one event shape either way.
    pub async fn run_stream(
        &self,
        request: &ChatRequest,
        signal: Option<AbortSignal>,
    ) -> Result<StreamingTurn, EngineError> {
        let (selection, session, options) = self.prepare(request).await?;

        let events = if selection.client.descriptor().capabilities.streaming {
            weft_ai::send_stream(selection.client, session.messages.clone(), options, signal)
        } else {
            debug!(vendor = %selection.vendor, "vendor lacks streaming, bridging blocking call");
            blocking_bridge(selection, session.messages.clone(), options, signal)
        };

        Ok(StreamingTurn {
            events,
            session,
            sessions: self.sessions.clone(),
        })
    }

    /// Shared front half of a turn: vendor selection, pattern and
    /// context resolution, prior-session load, and message assembly.
    async fn prepare(
        &self,
        request: &ChatRequest,
    ) -> Result<(Selection, Session, ChatOptions), EngineError> {
        let selection = self
            .vendors
            .select(request.model.as_deref(), request.vendor.as_deref())
            .await?;

        let pattern = self.patterns.resolve_request(request.pattern.as_deref())?;
        let context_text = lookup(
            self.contexts.as_ref(),
            request.context.as_deref(),
            EngineError::ContextNotFound,
        )?;
        let strategy_text = lookup(
            self.strategies.as_ref(),
            request.strategy.as_deref(),
            EngineError::StrategyNotFound,
        )?;

        let prior = match (&request.session, &self.sessions) {
            (Some(name), Some(store)) => store.load(name),
            _ => None,
        };

        let vendor_raw = selection.client.descriptor().capabilities.raw_mode;
        let session = build_session(
            request,
            &pattern,
            &context_text,
            &strategy_text,
            prior,
            vendor_raw,
            &self.directives,
        )?;

        let mut options = request.options.clone();
        if options.model.is_none() {
            options.model.clone_from(&selection.model);
        }
        debug!(
            vendor = %selection.vendor,
            model = options.model.as_deref().unwrap_or("(vendor default)"),
            messages = session.messages.len(),
            "dispatching turn"
        );

        Ok((selection, session, options))
    }
}

fn lookup(
    store: Option<&PatternStoreRef>,
    name: Option<&str>,
    missing: fn(String) -> EngineError,
) -> Result<String, EngineError> {
    let Some(name) = name else {
        return Ok(String::new());
    };
    store
        .and_then(|store| store.get(name))
        .ok_or_else(|| missing(name.to_string()))
}

fn persist(store: &Option<SessionStoreRef>, session: &Session) -> Result<(), EngineError> {
    if let (Some(store), Some(name)) = (store, &session.name) {
        store.save(name, session)?;
        debug!(session = %name, messages = session.messages.len(), "session saved");
    }
    Ok(())
}

/// Replays a blocking vendor call as a minimal event stream: one chunk
/// carrying the whole reply, then `done`.
fn blocking_bridge(
    selection: Selection,
    messages: Vec<Message>,
    options: ChatOptions,
    signal: Option<AbortSignal>,
) -> ChatEventStream {
    let stream = ChatEventStream::new();
    let relay = stream.clone();
    tokio::spawn(async move {
        match weft_ai::send(selection.client, messages, options, signal).await {
            Ok(reply) => {
                relay.push(StreamEvent::Chunk(StreamChunk {
                    seq: 0,
                    text: reply.content.clone(),
                }));
                relay.push(StreamEvent::Done {
                    text: reply.content,
                });
            }
            Err(error) => relay.push(StreamEvent::Error(error)),
        }
        relay.close();
    });
    stream
}
