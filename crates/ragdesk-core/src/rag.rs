//! Answer assembly trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, SearchResult};

/// Which assembler turns search hits into an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStrategy {
    /// Keyword-selected templates wrapping the best excerpt
    Template,
    /// Retrieved chunks handed to a generative text provider
    Generative,
}

impl AnswerStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStrategy::Template => "template",
            AnswerStrategy::Generative => "generative",
        }
    }
}

impl std::str::FromStr for AnswerStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "template" | "templates" => Ok(AnswerStrategy::Template),
            "generative" | "llm" | "gpt" => Ok(AnswerStrategy::Generative),
            other => Err(Error::Configuration(format!(
                "unknown answer strategy '{}', expected 'template' or 'generative'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AnswerStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final answer plus the hits it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: SearchResult,
}

/// Trait for answer assemblers
///
/// Assembly never fails: provider trouble degrades to an explanatory answer so
/// the conversation stays usable.
#[async_trait]
pub trait AnswerAssembler: Send + Sync {
    fn strategy(&self) -> AnswerStrategy;

    async fn assemble(&self, question: &str, results: &SearchResult) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("template".parse::<AnswerStrategy>().unwrap(), AnswerStrategy::Template);
        assert_eq!(" LLM ".parse::<AnswerStrategy>().unwrap(), AnswerStrategy::Generative);
        assert!("magic".parse::<AnswerStrategy>().is_err());
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(AnswerStrategy::Generative.to_string(), "generative");
    }
}
