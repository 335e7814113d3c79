//! Chat sessions
//!
//! A session owns one transcript and answers questions through a shared
//! pipeline. Errors are turned into assistant messages so the conversation
//! keeps going.

use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use ragdesk_core::{Message, Result, SearchResult, Transcript};
use ragdesk_rag::{IngestReport, RagPipeline};

/// A line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Reset,
    History,
    Stats,
    Load(String),
    Exit,
    Ask(String),
    Empty,
}

impl ChatCommand {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.to_lowercase().as_str() {
            "" => return ChatCommand::Empty,
            "help" | "?" => return ChatCommand::Help,
            "reset" | "clear" => return ChatCommand::Reset,
            "history" => return ChatCommand::History,
            "stats" => return ChatCommand::Stats,
            "exit" | "quit" | "종료" => return ChatCommand::Exit,
            _ => {}
        }

        match input.split_once(char::is_whitespace) {
            Some((head, rest)) if head.eq_ignore_ascii_case("load") && !rest.trim().is_empty() => {
                ChatCommand::Load(rest.trim().to_string())
            }
            _ => ChatCommand::Ask(input.to_string()),
        }
    }
}

/// Answer shown for one user turn
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub sources: SearchResult,
}

/// One conversation with the pipeline
pub struct ChatSession {
    id: Uuid,
    pipeline: Arc<RagPipeline>,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline,
            transcript: Transcript::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Record a question and its answer
    pub async fn submit(&mut self, question: &str) -> Reply {
        self.transcript.push(Message::user(question));

        let reply = match self.pipeline.ask(question).await {
            Ok(answer) => Reply {
                text: answer.text,
                sources: answer.sources,
            },
            Err(e) => {
                warn!(session = %self.id, error = %e, "question failed");
                Reply {
                    text: format!("❌ {}", e),
                    sources: SearchResult::empty(),
                }
            }
        };

        self.transcript.push(Message::assistant(reply.text.clone()));
        reply
    }

    /// Forget the conversation; the index is untouched
    pub fn reset(&mut self) {
        self.transcript.clear();
    }

    /// Replace the indexed documents with one file
    pub async fn load(&self, path: &Path) -> Result<IngestReport> {
        self.pipeline.ingest_files(&[path]).await
    }
}
