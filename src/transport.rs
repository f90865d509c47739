//! Transport seam between the engine and the chat backend
//!
//! `Transport` is the only surface that touches the network. The production
//! implementation wraps `reqwest`; tests substitute a scripted mock.

use crate::error::ChatError;
use crate::request::{RequestBody, TurnRequest};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::Deserialize;

/// Raw response bytes, io-flavored so they feed a `StreamReader` directly
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

pub const EVENT_STREAM_MIME: &str = "text/event-stream";

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a turn request and returns the response byte stream.
    /// Non-success statuses are classified and returned as errors before
    /// any bytes are surfaced.
    async fn open_stream(&self, request: TurnRequest) -> Result<ByteStream, ChatError>;

    /// Fetches the ids of models the backend will accept.
    async fn list_models(&self) -> Result<Vec<String>, ChatError>;
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<String>,
}

/// Production transport over HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, request: TurnRequest) -> Result<ByteStream, ChatError> {
        let url = format!("{}{}", self.base_url, request.endpoint.path());
        let builder = match request.body {
            RequestBody::Json(body) => self
                .client
                .post(&url)
                .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME))
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .json(&body),
            RequestBody::Multipart(fields) => {
                // Content-Type is left to the multipart encoder so the
                // boundary parameter stays intact.
                let mut form = reqwest::multipart::Form::new().text("query", fields.query);
                if fields.search_internet {
                    form = form.text("search_internet", "true");
                }
                if let Some(model) = fields.model {
                    form = form.text("model", model);
                }
                if let Some(attachment) = fields.file {
                    let part = reqwest::multipart::Part::bytes(attachment.bytes)
                        .file_name(attachment.metadata.file_name)
                        .mime_str(&attachment.metadata.file_type)
                        .map_err(|e| ChatError::client_error(format!("invalid attachment mime type: {e}")))?;
                    form = form.part("file", part);
                }
                self.client
                    .post(&url)
                    .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME))
                    .multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::network(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::from_status(status.as_u16(), &body));
        }

        Ok(response
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other))
            .boxed())
    }

    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::network(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::from_status(status.as_u16(), &body));
        }

        let parsed: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ChatError::server_error(format!("malformed models response: {e}")))?;
        Ok(parsed.models)
    }
}
