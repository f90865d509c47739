//! SSE response consumption
//!
//! Frames `data:` lines out of the response byte stream, parses each event
//! payload, and turns events into ordered [`Delta`] values. Malformed
//! payloads are dropped with a log line; the stream itself keeps going.

use crate::error::ChatError;
use crate::transport::ByteStream;
use crate::types::{Delta, SearchSource};
use serde::Deserialize;
use std::collections::VecDeque;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

const MAX_EVENT_LINE_BYTES: usize = 1024 * 1024;

/// How a consumed stream ended
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The server closed the stream normally
    Closed,
    /// The stream was cancelled locally
    Aborted,
    /// The transport failed mid-stream
    Errored(ChatError),
}

/// One parsed wire event
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    content: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    search_sources: Option<Vec<SearchSource>>,
}

/// Deltas for a single event, in surfacing order: sources first, then text.
/// An event that carries a sources field but no content produces no text
/// delta, even when the source list is empty.
fn deltas_for_event(event: StreamEvent) -> Vec<Delta> {
    let mut deltas = Vec::new();
    let sources_present = event.search_sources.is_some();
    if let Some(sources) = event.search_sources.filter(|sources| !sources.is_empty()) {
        deltas.push(Delta::Sources {
            sources,
            model: event.model.clone(),
        });
    }
    if sources_present && event.content.is_empty() {
        return deltas;
    }
    deltas.push(Delta::Text {
        content: event.content,
        model: event.model,
    });
    deltas
}

/// Pull-based delta sequence over a response byte stream
pub struct SseDeltas {
    lines: FramedRead<StreamReader<ByteStream, bytes::Bytes>, LinesCodec>,
    pending: VecDeque<Delta>,
}

impl SseDeltas {
    pub fn new(bytes: ByteStream) -> Self {
        Self {
            lines: FramedRead::new(
                StreamReader::new(bytes),
                LinesCodec::new_with_max_length(MAX_EVENT_LINE_BYTES),
            ),
            pending: VecDeque::new(),
        }
    }

    /// Next delta in arrival order. `None` means the server closed the
    /// stream; an error means the transport failed and the stream is done.
    pub async fn next(&mut self) -> Option<Result<Delta, ChatError>> {
        loop {
            if let Some(delta) = self.pending.pop_front() {
                return Some(Ok(delta));
            }
            match self.lines.next().await? {
                Err(e) => {
                    return Some(Err(ChatError::network(format!(
                        "response stream failed: {e}"
                    ))));
                }
                Ok(line) => {
                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();
                    if payload.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<StreamEvent>(payload) {
                        Ok(event) => self.pending.extend(deltas_for_event(event)),
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping malformed stream event");
                        }
                    }
                }
            }
        }
    }
}
