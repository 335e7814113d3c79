//! Generative answer assembly

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use ragdesk_core::{
    AnswerAssembler, AnswerStrategy, GenerationConfig, GenerationOutcome, SearchResult,
    TextGenerator, generate_with_timeout,
};

/// Prepended to answers produced without any retrieved context
pub const GENERAL_KNOWLEDGE_DISCLAIMER: &str =
    "ℹ️ Nothing in the company documents matched, so this answer comes from general knowledge.";

const INSTRUCTIONS: &str = "Rules:\n\
1. Answer only from the company information above.\n\
2. If the information is not there, say explicitly that it is not available.\n\
3. Answer in the same language as the question.\n\
4. Keep exact values such as passwords, IDs and IP addresses unchanged.";

/// Generative strategy backed by a text generator
pub struct GenerativeAssembler {
    generator: Arc<dyn TextGenerator>,
    config: GenerationConfig,
}

impl GenerativeAssembler {
    pub fn new(generator: Arc<dyn TextGenerator>, config: GenerationConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Prompt grounded in retrieved context
    pub fn build_prompt(question: &str, results: &SearchResult) -> String {
        let context = results
            .texts()
            .map(|text| format!("- {}", text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are the company's IT assistant. Answer the question using the company information below.\n\n\
             Company information:\n{}\n\n\
             Question: {}\n\n\
             {}\n\n\
             Answer:",
            context, question, INSTRUCTIONS
        )
    }

    /// Prompt used when retrieval found nothing
    pub fn build_open_prompt(question: &str) -> String {
        format!(
            "You are the company's IT assistant. No company documents matched this question, \
             so give a short best-effort answer from general knowledge in the question's language.\n\n\
             Question: {}\n\n\
             Answer:",
            question
        )
    }

    fn fallback(outcome: &GenerationOutcome, results: &SearchResult) -> String {
        let reason = match outcome {
            GenerationOutcome::TimedOut(limit) => {
                format!("⚠️ The answer service did not respond within {:?}.", limit)
            }
            GenerationOutcome::Failed(message) => {
                format!("⚠️ The answer service failed: {}", message)
            }
            GenerationOutcome::Completed(text) => return text.clone(),
        };

        match results.top() {
            Some(hit) => format!("{}\nMost relevant excerpt:\n{}", reason, hit.text),
            None => reason,
        }
    }
}

#[async_trait]
impl AnswerAssembler for GenerativeAssembler {
    fn strategy(&self) -> AnswerStrategy {
        AnswerStrategy::Generative
    }

    async fn assemble(&self, question: &str, results: &SearchResult) -> String {
        let prompt = if results.is_empty() {
            Self::build_open_prompt(question)
        } else {
            Self::build_prompt(question, results)
        };
        debug!(hits = results.len(), model = %self.config.model_id, "generating answer");

        let outcome = generate_with_timeout(self.generator.as_ref(), &prompt, &self.config).await;
        let body = match &outcome {
            GenerationOutcome::Completed(text) => text.clone(),
            other => {
                warn!(outcome = ?other, "generation degraded to fallback answer");
                Self::fallback(other, results)
            }
        };

        if results.is_empty() {
            format!("{}\n\n{}", GENERAL_KNOWLEDGE_DISCLAIMER, body)
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGenerator;
    use ragdesk_core::{ChunkKind, ChunkMetadata, SearchHit};
    use std::time::Duration;

    fn results(texts: &[&str]) -> SearchResult {
        SearchResult {
            hits: texts
                .iter()
                .enumerate()
                .map(|(i, text)| SearchHit {
                    id: format!("hit-{}", i),
                    text: text.to_string(),
                    metadata: ChunkMetadata {
                        source_filename: "it.txt".to_string(),
                        section_title: None,
                        kind: ChunkKind::Fragment,
                        sequence_index: i,
                    },
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect(),
        }
    }

    fn config(timeout: Duration) -> GenerationConfig {
        GenerationConfig {
            timeout,
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_lists_context() {
        let prompt = GenerativeAssembler::build_prompt(
            "what is the wifi password",
            &results(&["WiFi network: CorpNet, password: Corp2024!", "Printer IP: 192.168.1.50"]),
        );
        assert!(prompt.contains("- WiFi network: CorpNet, password: Corp2024!\n- Printer IP: 192.168.1.50"));
        assert!(prompt.contains("Question: what is the wifi password"));
        assert!(prompt.contains("same language as the question"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[tokio::test]
    async fn test_reply_is_returned_verbatim() {
        let generator = Arc::new(ScriptedGenerator::replying("  The password is Corp2024!  "));
        let assembler = GenerativeAssembler::new(generator.clone(), config(Duration::from_secs(5)));

        let answer = assembler
            .assemble("wifi password?", &results(&["WiFi network: CorpNet, password: Corp2024!"]))
            .await;
        assert_eq!(answer, "  The password is Corp2024!  ");
        assert_eq!(generator.prompts().len(), 1);
        assert!(generator.prompts()[0].contains("CorpNet"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_top_chunk() {
        let generator = Arc::new(ScriptedGenerator::stalling(Duration::from_secs(5)));
        let assembler = GenerativeAssembler::new(generator, config(Duration::from_millis(20)));

        let answer = assembler
            .assemble("printer?", &results(&["Printer IP: 192.168.1.50", "Other"]))
            .await;
        assert!(answer.starts_with("⚠️"));
        assert!(answer.contains("Printer IP: 192.168.1.50"));
        assert!(!answer.contains("Other"));
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let generator = Arc::new(ScriptedGenerator::failing("invalid api key"));
        let assembler = GenerativeAssembler::new(generator, config(Duration::from_secs(5)));

        let answer = assembler.assemble("printer?", &results(&["Printer IP: 192.168.1.50"])).await;
        assert!(answer.contains("invalid api key"));
        assert!(answer.contains("Printer IP: 192.168.1.50"));
    }

    #[tokio::test]
    async fn test_empty_results_get_disclaimer() {
        let generator = Arc::new(ScriptedGenerator::replying("Restart the router."));
        let assembler = GenerativeAssembler::new(generator.clone(), config(Duration::from_secs(5)));

        let answer = assembler.assemble("how do I fix slow internet", &SearchResult::empty()).await;
        assert!(answer.starts_with(GENERAL_KNOWLEDGE_DISCLAIMER));
        assert!(answer.ends_with("Restart the router."));
        assert!(generator.prompts()[0].contains("general knowledge"));
    }

    #[tokio::test]
    async fn test_empty_results_with_failing_provider() {
        let generator = Arc::new(ScriptedGenerator::failing("quota exceeded"));
        let assembler = GenerativeAssembler::new(generator, config(Duration::from_secs(5)));

        let answer = assembler.assemble("anything", &SearchResult::empty()).await;
        assert!(answer.starts_with(GENERAL_KNOWLEDGE_DISCLAIMER));
        assert!(answer.contains("quota exceeded"));
    }
}
