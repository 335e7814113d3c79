//! Scripted text generator for tests

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use ragdesk_core::{Error, GenerationConfig, GenerationResult, Result, TextGenerator};

enum Script {
    Reply(String),
    Stall(Duration),
    Fail(String),
}

/// Generator that answers from a fixed script and records every prompt
pub struct ScriptedGenerator {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_script(Script::Reply(text.to_string()))
    }

    pub fn stalling(delay: Duration) -> Self {
        Self::with_script(Script::Stall(delay))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_script(Script::Fail(message.to_string()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<GenerationResult> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let text = match &self.script {
            Script::Reply(text) => text.clone(),
            Script::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                "too late".to_string()
            }
            Script::Fail(message) => return Err(Error::Generation(message.clone())),
        };

        Ok(GenerationResult {
            text,
            model_id: config.model_id.clone(),
            tokens_used: None,
        })
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
