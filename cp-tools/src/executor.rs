use crate::error::ToolError;
use crate::policy::tool_requires_confirmation;
use crate::queries;
use crate::store::Store;
use cp_llm::ToolCall;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a read-only query. Business failures are carried in `error`,
/// never raised: the conversation must survive a failed tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryExecutionResult {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

pub struct ToolExecutor {
    store: Arc<dyn Store>,
}

impl ToolExecutor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    /// Runs a read-only query tool. Side-effecting tools are refused here:
    /// they only execute through the confirmation endpoint after approval.
    #[tracing::instrument(level = "info", skip_all, fields(tool_name = %call.name, user_id = %user_id))]
    pub async fn execute(&self, call: &ToolCall, user_id: &str) -> QueryExecutionResult {
        if tool_requires_confirmation(&call.name) {
            return QueryExecutionResult::failed(
                ToolError::RequiresConfirmation(call.name.clone()).to_string(),
            );
        }

        let store = self.store.as_ref();
        let args = &call.arguments;
        let started = Instant::now();
        let result = match call.name.as_str() {
            "listar_clientes" => queries::listar_clientes(store, user_id).await,
            "buscar_cliente" => queries::buscar_cliente(store, user_id, args).await,
            "listar_reunioes" => queries::listar_reunioes(store, user_id).await,
            "listar_tarefas" => queries::listar_tarefas(store, user_id).await,
            "listar_pagamentos" => queries::listar_pagamentos(store, user_id).await,
            "resumo_dia" => queries::resumo_dia(store, user_id).await,
            "resumo_cliente" => queries::resumo_cliente(store, user_id, args).await,
            "analisar_performance" => queries::analisar_performance(store, user_id).await,
            "gerar_mensagem" => queries::gerar_mensagem(store, user_id, args).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        };

        match result {
            Ok(data) => {
                tracing::info!(
                    latency_ms = started.elapsed().as_millis() as u64,
                    "query tool executed"
                );
                QueryExecutionResult::ok(data)
            }
            Err(e) => {
                tracing::warn!(
                    latency_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "query tool failed"
                );
                QueryExecutionResult::failed(e.to_string())
            }
        }
    }
}
