//! Conversation session: turn submission, single-live-stream control,
//! and the consumer task that folds deltas into the store
//!
//! At most one response stream is live per session. Starting a turn
//! synchronously cancels whatever was live before it; once `send` or
//! `stop` returns, the superseded stream can no longer touch history
//! because every fold is gated on a liveness check under the slot lock.

use crate::models::ModelCatalog;
use crate::reducer::message_for_delta;
use crate::request::{build_request, RequestError, TurnInput, TurnRequest};
use crate::store::ConversationStore;
use crate::stream::{SseDeltas, StreamOutcome};
use crate::transport::Transport;
use crate::types::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Identity of one started stream, held by its consumer task
#[derive(Debug, Clone)]
pub struct StreamHandle {
    id: u64,
    token: CancellationToken,
}

struct LiveStream {
    id: u64,
    token: CancellationToken,
}

/// Single-slot controller for the session's live stream
pub struct StreamController {
    slot: Mutex<Option<LiveStream>>,
    next_id: AtomicU64,
}

impl StreamController {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<LiveStream>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new stream as the live one, cancelling any predecessor
    /// before this call returns.
    pub fn start_request(&self) -> StreamHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let mut slot = self.lock_slot();
        if let Some(previous) = slot.take() {
            previous.token.cancel();
            tracing::debug!(
                superseded = previous.id,
                stream = id,
                "superseding live stream"
            );
        }
        *slot = Some(LiveStream {
            id,
            token: token.clone(),
        });
        StreamHandle { id, token }
    }

    /// Cancels the live stream, if any. Returns whether one was live.
    /// Safe to call at any time, including with nothing in flight.
    pub fn stop(&self) -> bool {
        let mut slot = self.lock_slot();
        match slot.take() {
            Some(live) => {
                live.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Clears the slot on a terminal outcome, but only if the finishing
    /// stream is still the live one. A superseded or stopped stream's
    /// terminal is a no-op here.
    fn clear_if_live(&self, handle_id: u64) -> bool {
        let mut slot = self.lock_slot();
        if slot.as_ref().is_some_and(|live| live.id == handle_id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn is_live(&self, handle: &StreamHandle) -> bool {
        self.lock_slot()
            .as_ref()
            .is_some_and(|live| live.id == handle.id)
    }
}

impl Default for StreamController {
    fn default() -> Self {
        Self::new()
    }
}

struct SessionInner {
    store: ConversationStore,
    controller: StreamController,
    loading_tx: watch::Sender<bool>,
    notice_tx: watch::Sender<Option<String>>,
}

impl SessionInner {
    /// Folds an update into history only while the handle is still live.
    /// Held under the slot lock so a supersede that already returned can
    /// never race a stale delta into the store.
    fn apply_if_live(&self, handle_id: u64, update: Message) -> bool {
        let slot = self.controller.lock_slot();
        if slot.as_ref().is_some_and(|live| live.id == handle_id) {
            self.store.apply(update);
            true
        } else {
            false
        }
    }

    fn finish(&self, handle_id: u64, outcome: StreamOutcome) {
        let conv_id = self.store.conversation_id().to_string();
        let cleared = self.controller.clear_if_live(handle_id);
        if cleared {
            self.loading_tx.send_replace(false);
        }
        match outcome {
            StreamOutcome::Closed => {
                tracing::debug!(conv_id = %conv_id, stream = handle_id, "stream closed");
            }
            StreamOutcome::Aborted => {
                tracing::info!(conv_id = %conv_id, stream = handle_id, "stream aborted");
            }
            StreamOutcome::Errored(error) => {
                tracing::error!(
                    conv_id = %conv_id,
                    stream = handle_id,
                    error = %error,
                    retryable = error.kind.is_retryable(),
                    "stream failed"
                );
                if cleared {
                    self.notice_tx.send_replace(Some(error.message));
                }
            }
        }
    }
}

/// One conversation bound to a transport
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    catalog: ModelCatalog,
    inner: Arc<SessionInner>,
}

impl ChatSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        conversation_id: impl Into<String>,
        catalog: ModelCatalog,
    ) -> Self {
        let (loading_tx, _) = watch::channel(false);
        let (notice_tx, _) = watch::channel(None);
        Self {
            transport,
            catalog,
            inner: Arc::new(SessionInner {
                store: ConversationStore::new(conversation_id),
                controller: StreamController::new(),
                loading_tx,
                notice_tx,
            }),
        }
    }

    pub fn history(&self) -> watch::Receiver<Arc<[Message]>> {
        self.inner.store.subscribe()
    }

    pub fn snapshot(&self) -> Arc<[Message]> {
        self.inner.store.snapshot()
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading_tx.subscribe()
    }

    /// Non-fatal error notices from terminal stream failures
    pub fn notices(&self) -> watch::Receiver<Option<String>> {
        self.inner.notice_tx.subscribe()
    }

    /// Submits one turn. Appends the user entry, supersedes any live
    /// stream, and spawns the consumer task for the response.
    ///
    /// Rejects input that is empty after trimming without touching
    /// history or the live stream.
    pub fn send(&self, input: TurnInput) -> Result<(), RequestError> {
        let resolved_model = self.catalog.resolve(input.model.as_deref());
        let request = build_request(&input, resolved_model)?;

        // supersede before touching history so the old stream cannot fold
        // a delta after the new user entry lands
        let handle = self.inner.controller.start_request();

        let user = Message::user(
            input.text,
            input.attachment.map(|a| a.metadata),
            input.search_internet,
        );
        self.inner.store.apply(user);

        self.inner.loading_tx.send_replace(true);
        self.inner.notice_tx.send_replace(None);

        let transport = Arc::clone(&self.transport);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            run_stream(transport, inner, handle, request).await;
        });
        Ok(())
    }

    /// Cancels the live stream, if any, and clears the loading state.
    /// Idempotent.
    pub fn stop(&self) {
        if self.inner.controller.stop() {
            self.inner.loading_tx.send_replace(false);
            tracing::info!(conv_id = %self.inner.store.conversation_id(), "stopped live stream");
        }
    }
}

async fn run_stream(
    transport: Arc<dyn Transport>,
    inner: Arc<SessionInner>,
    handle: StreamHandle,
    request: TurnRequest,
) {
    let bytes = tokio::select! {
        biased;
        () = handle.token.cancelled() => {
            inner.finish(handle.id, StreamOutcome::Aborted);
            return;
        }
        result = transport.open_stream(request) => match result {
            Ok(bytes) => bytes,
            Err(error) => {
                inner.finish(handle.id, StreamOutcome::Errored(error));
                return;
            }
        },
    };

    let mut deltas = SseDeltas::new(bytes);
    loop {
        let outcome = tokio::select! {
            biased;
            () = handle.token.cancelled() => StreamOutcome::Aborted,
            next = deltas.next() => match next {
                None => StreamOutcome::Closed,
                Some(Err(error)) => StreamOutcome::Errored(error),
                Some(Ok(delta)) => {
                    if inner.apply_if_live(handle.id, message_for_delta(delta)) {
                        continue;
                    }
                    // no longer live; terminal bookkeeping already happened
                    return;
                }
            },
        };
        inner.finish(handle.id, outcome);
        return;
    }
}
