//! Grounded answer generation.
//!
//! [`AnswerSynthesizer::answer`] never fails: any transport or model error
//! is logged and replaced by a localized fallback sentence.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AssistantConfig, LlmConfig};
use crate::language::Language;
use crate::llm::{ChatMessage, ChatRequest, ChatTransport};
use crate::models::RetrievalResult;
use crate::prompts;

pub struct AnswerSynthesizer {
    transport: Arc<dyn ChatTransport>,
    assistant: AssistantConfig,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerSynthesizer {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        llm: &LlmConfig,
        assistant: &AssistantConfig,
    ) -> Self {
        Self {
            transport,
            assistant: assistant.clone(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the two-message request for `query` over `retrieved`.
    pub fn build_request(
        &self,
        query: &str,
        retrieved: &[RetrievalResult],
        lang: Language,
    ) -> ChatRequest {
        let context = prompts::format_context(retrieved, lang);
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompts::system_prompt(&self.assistant, &context, lang)),
                ChatMessage::user(query),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub async fn answer(&self, query: &str, retrieved: &[RetrievalResult], lang: Language) -> String {
        let request = self.build_request(query, retrieved, lang);
        match self.transport.complete(&request).await {
            Ok(raw) => match post_process(&raw) {
                Some(text) => text,
                None => {
                    warn!("Model returned an empty answer; using fallback");
                    prompts::fallback_answer(lang).to_string()
                }
            },
            Err(e) => {
                info!("Answer synthesis failed: {}", e);
                prompts::fallback_answer(lang).to_string()
            }
        }
    }
}

/// Strip `*` emphasis, trim, and end with sentence punctuation.
///
/// Returns `None` when nothing is left.
pub fn post_process(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| *c != '*').collect();
    let mut text = cleaned.trim().to_string();
    if text.is_empty() {
        return None;
    }
    if !text.ends_with(&['.', '!', '?'][..]) {
        text.push('.');
    }
    Some(text)
}
