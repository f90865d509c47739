//! Turn input validation and wire request construction

use crate::types::AttachmentBytes;
use serde::Serialize;
use thiserror::Error;

/// Everything the caller supplies for one turn
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub text: String,
    pub attachment: Option<AttachmentBytes>,
    pub search_internet: bool,
    pub model: Option<String>,
}

impl TurnInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("query is empty")]
    EmptyQuery,
}

/// Which backend route a turn is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Plain streaming chat
    Stream,
    /// Streaming chat with attachment and/or web search context
    StreamWithContext,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Stream => "/chat/stream",
            Self::StreamWithContext => "/chat/stream-with-context",
        }
    }
}

/// JSON body for the plain streaming route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Multipart fields for the context-augmented route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFields {
    pub query: String,
    pub file: Option<AttachmentBytes>,
    pub search_internet: bool,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(ChatRequest),
    Multipart(ContextFields),
}

/// A fully shaped turn request, ready for a transport to send
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub endpoint: Endpoint,
    pub body: RequestBody,
}

/// Shapes a turn into its wire request. The query is trimmed for the
/// emptiness check only; the submitted text is sent as typed.
pub fn build_request(input: &TurnInput, resolved_model: Option<String>) -> Result<TurnRequest, RequestError> {
    if input.text.trim().is_empty() {
        return Err(RequestError::EmptyQuery);
    }

    if input.attachment.is_some() || input.search_internet {
        Ok(TurnRequest {
            endpoint: Endpoint::StreamWithContext,
            body: RequestBody::Multipart(ContextFields {
                query: input.text.clone(),
                file: input.attachment.clone(),
                search_internet: input.search_internet,
                model: resolved_model,
            }),
        })
    } else {
        Ok(TurnRequest {
            endpoint: Endpoint::Stream,
            body: RequestBody::Json(ChatRequest {
                query: input.text.clone(),
                model: resolved_model,
            }),
        })
    }
}
