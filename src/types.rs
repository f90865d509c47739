//! Conversation data types shared across the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Metadata for an attached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
}

/// Attachment metadata plus the raw bytes to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentBytes {
    pub metadata: FileAttachment,
    pub bytes: Vec<u8>,
}

impl AttachmentBytes {
    /// Reads a file from disk, sniffing the mime type from its extension.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path.file_name().map_or_else(
            || "attachment".to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        let file_type = mime_guess::from_path(path).first_or_octet_stream().to_string();
        Ok(Self {
            metadata: FileAttachment {
                file_name,
                file_size: bytes.len() as u64,
                file_type,
            },
            bytes,
        })
    }
}

/// One web search citation attached to an assistant response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    pub title: String,
    pub link: String,
}

/// Renderable projection of a message, regenerated from its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    FileAttachment {
        #[serde(rename = "fileAttachment")]
        file_attachment: FileAttachment,
    },
}

/// One entry in a conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_attachment: Option<FileAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_web_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_sources: Option<Vec<SearchSource>>,
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let mut message = Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            model: None,
            file_attachment: None,
            used_web_search: None,
            search_sources: None,
            parts: Vec::new(),
        };
        message.fill_parts();
        message
    }

    /// Builds the user entry for a submitted turn.
    pub fn user(
        content: impl Into<String>,
        attachment: Option<FileAttachment>,
        used_web_search: bool,
    ) -> Self {
        let mut message = Self::new(Role::User, content);
        message.file_attachment = attachment;
        message.used_web_search = used_web_search.then_some(true);
        message.fill_parts();
        message
    }

    /// Regenerates `parts` from `content` and the attachment metadata.
    /// Parts are a projection and never the source of truth.
    pub fn fill_parts(&mut self) {
        let mut parts = vec![MessagePart::Text {
            text: self.content.clone(),
        }];
        if let Some(attachment) = &self.file_attachment {
            parts.push(MessagePart::FileAttachment {
                file_attachment: attachment.clone(),
            });
        }
        self.parts = parts;
    }
}

/// One ordered increment produced by consuming a response stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// Appendable assistant text
    Text {
        content: String,
        model: Option<String>,
    },
    /// A batch of web search citations, surfaced before any text
    Sources {
        sources: Vec<SearchSource>,
        model: Option<String>,
    },
}
