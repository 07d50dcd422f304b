use crate::client::LlmClient;
use crate::error::{LlmError, Result};
use crate::types::{ChatMessage, ChatResponse, ToolDefinition};
use std::time::Instant;

/// Ordered chain of LLM clients. `chat` tries each client in turn and returns
/// the first successful response together with the provider label that
/// produced it; only when the whole chain fails does the caller see an error.
#[derive(Clone, Default)]
pub struct LlmRouter {
    clients: Vec<LlmClient>,
}

impl LlmRouter {
    pub fn new(clients: Vec<LlmClient>) -> Self {
        Self { clients }
    }

    pub fn has_available_provider(&self) -> bool {
        !self.clients.is_empty()
    }

    #[tracing::instrument(level = "info", skip_all, fields(chain_len = self.clients.len()))]
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<(ChatResponse, String)> {
        if self.clients.is_empty() {
            return Err(LlmError::NoProvider);
        }

        let mut last_error: Option<LlmError> = None;
        for (position, client) in self.clients.iter().enumerate() {
            let label = format!("{}:{}", client.provider().label(), client.model());
            let started = Instant::now();
            match client.chat(messages, tools).await {
                Ok(response) => {
                    tracing::info!(
                        provider = %label,
                        chain_position = position,
                        latency_ms = started.elapsed().as_millis() as u64,
                        prompt_tokens = response.usage.prompt_tokens,
                        completion_tokens = response.usage.completion_tokens,
                        tool_calls = response.message.tool_calls.len(),
                        "llm call succeeded"
                    );
                    return Ok((response, label));
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %label,
                        chain_position = position,
                        latency_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "llm call failed; trying next provider in chain"
                    );
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "empty chain".to_string());
        Err(LlmError::AllProvidersFailed(last))
    }
}
