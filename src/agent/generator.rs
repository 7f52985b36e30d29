use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::llm_client::{CompletionService, GenerationRequest};
use crate::prompt::PromptTemplate;

/// Why no reply text came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoReplyReason {
    /// The generation call failed (transport, auth, rate limit, bad payload).
    ServiceError(String),
    /// The call succeeded but carried no candidates.
    NoGenerations,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Trimmed text of the first candidate. May be empty.
    Reply(String),
    NoReply(NoReplyReason),
}

/// Fail-soft wrapper around the generation service.
#[derive(Clone)]
pub struct ReplyGenerator {
    service: Arc<dyn CompletionService>,
    template: Arc<dyn PromptTemplate>,
    params: GenerationConfig,
}

impl ReplyGenerator {
    pub fn new(
        service: Arc<dyn CompletionService>,
        template: Arc<dyn PromptTemplate>,
        params: GenerationConfig,
    ) -> Self {
        Self {
            service,
            template,
            params,
        }
    }

    /// Fresh request for one title; nothing is shared between candidates.
    pub fn request_for(&self, title: &str) -> GenerationRequest {
        GenerationRequest {
            prompt: self.template.render(title),
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            stop_sequences: self.params.stop_sequences.clone(),
            frequency_penalty: self.params.frequency_penalty,
        }
    }

    /// Never returns an error: every failure becomes `NoReply`.
    pub async fn generate(&self, title: &str) -> GenerationOutcome {
        let request = self.request_for(title);

        match self.service.complete(&request).await {
            Ok(response) => match response.generations.first() {
                Some(generation) => GenerationOutcome::Reply(generation.text.trim().to_string()),
                None => {
                    tracing::warn!("Generation returned no candidates for '{}'", title);
                    GenerationOutcome::NoReply(NoReplyReason::NoGenerations)
                }
            },
            Err(e) => {
                tracing::error!("Error generating reply: {:#}", e);
                GenerationOutcome::NoReply(NoReplyReason::ServiceError(format!("{:#}", e)))
            }
        }
    }
}
