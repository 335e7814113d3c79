//! Common types used across the ragdesk pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a chunk was cut out of its source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Sentences packed up to the size budget
    Fragment,
    /// A content line outside of any section, or a section line on its own
    Standalone,
    /// A detected section title
    Title,
    /// A content line prefixed with its section title
    Item,
    /// A whole section: title followed by all of its content lines
    CompleteSection,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Fragment => "fragment",
            ChunkKind::Standalone => "standalone",
            ChunkKind::Title => "title",
            ChunkKind::Item => "item",
            ChunkKind::CompleteSection => "complete_section",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bounded segment of a source document, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub section_title: Option<String>,
    pub source_filename: String,
    pub sequence_index: usize,
    pub kind: ChunkKind,
}

impl Chunk {
    /// Metadata stored next to the chunk's vector in the index
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source_filename: self.source_filename.clone(),
            section_title: self.section_title.clone(),
            kind: self.kind,
            sequence_index: self.sequence_index,
        }
    }
}

/// Per-entry metadata kept by the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    pub kind: ChunkKind,
    pub sequence_index: usize,
}

/// Speaker of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only conversation transcript owned by a single session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message; the transcript is never partially truncated
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
