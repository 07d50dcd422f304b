//! Assistant agent: one model turn over the user's message, context snapshot
//! and recent history. No tool loop here; the orchestrator decides whether a
//! returned tool call is executed or turned into a confirmation.

use crate::context::UserContext;
use anyhow::Result;
use async_trait::async_trait;
use cp_llm::{ChatMessage, LlmRouter, ToolCall};
use serde::Deserialize;
use std::time::Instant;

const HISTORY_LIMIT: usize = 20;

/// One prior turn, as the dashboard replays it on every request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// What a model turn produced.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub message: String,
    pub tool_calls: Vec<ToolCall>,
    pub provider: String,
}

/// Seam between the orchestrator and the model, so request handling can be
/// tested against a scripted implementation.
#[async_trait]
pub trait ModelCapability: Send + Sync {
    fn has_available_provider(&self) -> bool;

    async fn process_message(
        &self,
        message: &str,
        context: &UserContext,
        history: &[ChatTurn],
    ) -> Result<ModelReply>;
}

pub struct AssistantAgent {
    router: LlmRouter,
    system_prompt: String,
    tools: Vec<cp_llm::ToolDefinition>,
}

impl AssistantAgent {
    pub fn new(router: LlmRouter, system_prompt: String) -> Self {
        Self {
            router,
            system_prompt,
            tools: cp_tools::tool_definitions(),
        }
    }

    /// Prompt = configured persona + a snapshot of the user's workspace, so
    /// the model can resolve "a reunião com a ACME" without a lookup turn.
    fn build_system_prompt(&self, context: &UserContext) -> String {
        let mut system = self.system_prompt.clone();
        system.push_str("\n\nContexto atual do usuário:\n");
        if context.clients.is_empty() {
            system.push_str("- Nenhum cliente cadastrado.\n");
        } else {
            system.push_str("- Clientes: ");
            let names: Vec<&str> = context.clients.iter().map(|c| c.name.as_str()).collect();
            system.push_str(&names.join(", "));
            system.push('\n');
        }
        system.push_str(&format!(
            "- Tarefas pendentes: {}\n",
            context.pending_tasks.len()
        ));
        system.push_str(&format!(
            "- Pagamentos pendentes: {}\n",
            context.pending_payments.len()
        ));
        if let Some(next) = context.upcoming_meetings.first() {
            system.push_str(&format!(
                "- Próxima reunião: {} às {} com {}\n",
                next.date, next.time, next.client_name
            ));
        }
        system.push_str(&format!(
            "- Data de hoje: {}\n",
            chrono::Utc::now().format("%Y-%m-%d")
        ));
        system
    }

    fn build_messages(
        &self,
        message: &str,
        context: &UserContext,
        history: &[ChatTurn],
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.build_system_prompt(context))];
        let skip = history.len().saturating_sub(HISTORY_LIMIT);
        for turn in &history[skip..] {
            match turn.role.as_str() {
                "assistant" => messages.push(ChatMessage::assistant(turn.content.clone())),
                // Anything unrecognized is treated as the user speaking.
                _ => messages.push(ChatMessage::user(turn.content.clone())),
            }
        }
        messages.push(ChatMessage::user(message.to_string()));
        messages
    }
}

#[async_trait]
impl ModelCapability for AssistantAgent {
    fn has_available_provider(&self) -> bool {
        self.router.has_available_provider()
    }

    #[tracing::instrument(level = "info", skip_all, fields(history_turns = history.len()))]
    async fn process_message(
        &self,
        message: &str,
        context: &UserContext,
        history: &[ChatTurn],
    ) -> Result<ModelReply> {
        let messages = self.build_messages(message, context, history);
        let started = Instant::now();
        let (response, provider) = self.router.chat(&messages, &self.tools).await?;
        tracing::info!(
            provider = %provider,
            latency_ms = started.elapsed().as_millis() as u64,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            tool_calls = response.message.tool_calls.len(),
            content_len = response.message.content.len(),
            "model turn completed"
        );
        Ok(ModelReply {
            message: response.message.content,
            tool_calls: response.message.tool_calls,
            provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_llm::{LlmClient, Role};
    use cp_tools::Client;

    fn agent() -> AssistantAgent {
        let clients: Vec<LlmClient> = vec![];
        AssistantAgent::new(LlmRouter::new(clients), "Você é o Copiloto.".to_string())
    }

    fn context_with_client(name: &str) -> UserContext {
        UserContext {
            clients: vec![Client {
                id: "c1".to_string(),
                name: name.to_string(),
                contact_name: None,
                phone: None,
                segment: None,
                status: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn system_prompt_includes_workspace_snapshot() {
        let agent = agent();
        let prompt = agent.build_system_prompt(&context_with_client("ACME"));
        assert!(prompt.starts_with("Você é o Copiloto."));
        assert!(prompt.contains("Clientes: ACME"));
        assert!(prompt.contains("Data de hoje:"));
    }

    #[test]
    fn history_is_capped_keeping_most_recent() {
        let agent = agent();
        let history: Vec<ChatTurn> = (0..30)
            .map(|i| ChatTurn {
                role: if i % 2 == 0 { "user" } else { "assistant" }.to_string(),
                content: format!("turno {i}"),
            })
            .collect();
        let messages = agent.build_messages("oi", &UserContext::default(), &history);

        // system + 20 history turns + current message
        assert_eq!(messages.len(), 22);
        assert_eq!(messages[1].content, "turno 10");
        assert_eq!(messages.last().map(|m| m.content.as_str()), Some("oi"));
        assert_eq!(messages[0].role, Role::System);
    }

    #[test]
    fn unknown_history_role_defaults_to_user() {
        let agent = agent();
        let history = vec![ChatTurn {
            role: "tool".to_string(),
            content: "saída antiga".to_string(),
        }];
        let messages = agent.build_messages("oi", &UserContext::default(), &history);
        assert_eq!(messages[1].role, Role::User);
    }
}
