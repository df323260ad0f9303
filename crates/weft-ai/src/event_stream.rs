use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::AiError;
use crate::types::StreamEvent;

type CompletionFn<T, R> = dyn Fn(&T) -> Option<R> + Send + Sync;

struct EventStreamInner<T, R> {
    queue: Mutex<VecDeque<T>>,
    completion: Arc<CompletionFn<T, R>>,
    final_result: Mutex<Option<R>>,
    event_notify: Notify,
    final_notify: Notify,
    closed: AtomicBool,
}

/// Multi-consumer event relay: a producer pushes events, one consumer
/// drains them in push order with `next`, and `result` resolves once a
/// terminal event has been observed. Pushing after close is a no-op.
pub struct EventStream<T, R> {
    inner: Arc<EventStreamInner<T, R>>,
}

impl<T, R> Clone for EventStream<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R> EventStream<T, R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
{
    pub fn new<F>(completion: F) -> Self
    where
        F: Fn(&T) -> Option<R> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(EventStreamInner {
                queue: Mutex::new(VecDeque::new()),
                completion: Arc::new(completion),
                final_result: Mutex::new(None),
                event_notify: Notify::new(),
                final_notify: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn push(&self, event: T) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }

        if let Some(result) = (self.inner.completion)(&event) {
            let mut guard = self
                .inner
                .final_result
                .lock()
                .expect("final_result mutex poisoned");
            if guard.is_none() {
                *guard = Some(result);
                self.inner.closed.store(true, Ordering::SeqCst);
            }
            drop(guard);
            self.inner.final_notify.notify_waiters();
        }

        self.inner
            .queue
            .lock()
            .expect("event queue mutex poisoned")
            .push_back(event);
        self.inner.event_notify.notify_waiters();
    }

    /// Closes the stream without a terminal event. A pending `result`
    /// resolves to `None`; `next` drains whatever was already queued.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.event_notify.notify_waiters();
        self.inner.final_notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub async fn next(&self) -> Option<T> {
        loop {
            // Register for the wakeup before checking state, otherwise a
            // push landing between the check and the await is lost.
            let notified = self.inner.event_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut queue = self.inner.queue.lock().expect("event queue mutex poisoned");
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.inner.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }

            notified.await;
        }
    }

    pub async fn result(&self) -> Option<R> {
        loop {
            let notified = self.inner.final_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self
                .inner
                .final_result
                .lock()
                .expect("final_result mutex poisoned")
                .clone()
            {
                return Some(result);
            }

            if self.inner.closed.load(Ordering::SeqCst) {
                return None;
            }

            notified.await;
        }
    }
}

/// Caller-visible side of one streamed dispatch. Terminal events double
/// as the final result: `done` resolves to the accumulated text, `error`
/// to the interrupt that ended the stream.
pub struct ChatEventStream {
    inner: EventStream<StreamEvent, Result<String, AiError>>,
}

impl ChatEventStream {
    pub fn new() -> Self {
        let inner = EventStream::new(|event| match event {
            StreamEvent::Done { text } => Some(Ok(text.clone())),
            StreamEvent::Error(error) => Some(Err(error.clone())),
            StreamEvent::Chunk(_) => None,
        });
        Self { inner }
    }

    pub fn push(&self, event: StreamEvent) {
        self.inner.push(event);
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub async fn next(&self) -> Option<StreamEvent> {
        self.inner.next().await
    }

    /// Final accumulated text, or the error that interrupted the stream.
    pub async fn result(&self) -> Option<Result<String, AiError>> {
        self.inner.result().await
    }
}

impl Clone for ChatEventStream {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Default for ChatEventStream {
    fn default() -> Self {
        Self::new()
    }
}
