//! Scripted transport for engine tests
//!
//! `MockTransport` pops one `ScriptedStream` per opened stream and records
//! every request it sees, so tests can drive the full session loop without
//! a backend.

use crate::error::ChatError;
use crate::request::TurnRequest;
use crate::transport::{ByteStream, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Wraps a JSON payload in SSE framing.
pub fn sse(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// One scripted response stream
pub enum ScriptedStream {
    /// Yields the frames, then closes
    Frames(Vec<String>),
    /// Sleeps the given duration before each frame, then closes
    DelayedFrames(Vec<(Duration, String)>),
    /// Yields the frames, then never closes (for cancellation tests)
    FramesThenHang(Vec<String>),
    /// Yields the frames, then fails with an io error
    FramesThenIoError(Vec<String>),
    /// Fails before any bytes are produced
    OpenError(ChatError),
}

pub struct MockTransport {
    scripts: Mutex<VecDeque<ScriptedStream>>,
    requests: Arc<Mutex<Vec<TurnRequest>>>,
    models: Vec<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_models(Vec::new())
    }

    pub fn with_models(models: Vec<String>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            models,
        }
    }

    pub fn push(&self, script: ScriptedStream) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Shared handle to the recorded requests, usable after the transport
    /// moves into a session.
    pub fn requests(&self) -> Arc<Mutex<Vec<TurnRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn ok_frames(frames: Vec<String>) -> Vec<std::io::Result<Bytes>> {
    frames.into_iter().map(|frame| Ok(Bytes::from(frame))).collect()
}

#[async_trait]
impl Transport for MockTransport {
    async fn open_stream(&self, request: TurnRequest) -> Result<ByteStream, ChatError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedStream::Frames(Vec::new()));
        match script {
            ScriptedStream::Frames(frames) => Ok(stream::iter(ok_frames(frames)).boxed()),
            ScriptedStream::DelayedFrames(frames) => Ok(stream::iter(frames)
                .then(|(delay, frame)| async move {
                    tokio::time::sleep(delay).await;
                    Ok(Bytes::from(frame))
                })
                .boxed()),
            ScriptedStream::FramesThenHang(frames) => Ok(stream::iter(ok_frames(frames))
                .chain(stream::pending())
                .boxed()),
            ScriptedStream::FramesThenIoError(frames) => {
                let mut items = ok_frames(frames);
                items.push(Err(std::io::Error::other("connection reset")));
                Ok(stream::iter(items).boxed())
            }
            ScriptedStream::OpenError(error) => Err(error),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.models.clone())
    }
}
