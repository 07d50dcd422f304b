//! Chat endpoint: one user message in, one of three outcomes out. A plain
//! answer, an executed read-only query with formatted text and follow-up
//! suggestions, or a pending confirmation for a side-effecting action.

use crate::assistant::ChatTurn;
use crate::compose::compose;
use crate::confirmation::{ConfirmationData, build_confirmation};
use crate::context::{build_user_context, context_suggestions};
use crate::http_auth::AuthedUser;
use crate::server::AppState;
use crate::suggest::SuggestedAction;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Json};
use cp_tools::{QueryExecutionResult, confirmation_type_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new().route("/api/v1/chat", post(post_chat))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<Vec<SuggestedAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

fn error_body(status: StatusCode, message: &str) -> (StatusCode, Json<ChatResponseBody>) {
    (
        status,
        Json(ChatResponseBody {
            message: message.to_string(),
            error: Some(message.to_string()),
            ..Default::default()
        }),
    )
}

#[tracing::instrument(level = "info", skip_all, fields(user_id = %user.0))]
async fn post_chat(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponseBody>) {
    let user_id = user.0.as_str();
    let message = request.message.trim();
    if message.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "Mensagem vazia");
    }
    if !state.model.has_available_provider() {
        return error_body(
            StatusCode::SERVICE_UNAVAILABLE,
            "Nenhum provedor de IA configurado",
        );
    }

    let context = match build_user_context(state.store.as_ref(), user_id).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "failed to load user context");
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Desculpe, ocorreu um erro ao processar sua mensagem.",
            );
        }
    };

    let reply = match state
        .model
        .process_message(message, &context, &request.conversation_history)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "model turn failed");
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Desculpe, ocorreu um erro ao processar sua mensagem.",
            );
        }
    };

    // Only the first tool call counts; anything past it is dropped.
    if reply.tool_calls.len() > 1 {
        tracing::debug!(
            dropped = reply.tool_calls.len() - 1,
            "model emitted multiple tool calls; keeping only the first"
        );
    }
    let Some(call) = reply.tool_calls.into_iter().next() else {
        return (
            StatusCode::OK,
            Json(ChatResponseBody {
                message: reply.message,
                suggested_actions: non_empty(context_suggestions(&context)),
                ..Default::default()
            }),
        );
    };

    if call.name.trim().is_empty() {
        tracing::warn!("model emitted a tool call without a name; answering with text only");
        return (
            StatusCode::OK,
            Json(ChatResponseBody {
                message: reply.message,
                ..Default::default()
            }),
        );
    }

    if let Some(confirmation_type) = confirmation_type_for(&call.name) {
        let confirmation = build_confirmation(
            state.store.as_ref(),
            &call,
            Some(confirmation_type),
            &context,
            user_id,
        )
        .await;
        let message = if reply.message.trim().is_empty() {
            compose(&call.name, Some(confirmation_type))
        } else {
            reply.message
        };
        return (
            StatusCode::OK,
            Json(ChatResponseBody {
                message,
                confirmation: Some(confirmation),
                ..Default::default()
            }),
        );
    }

    let result = state.executor.execute(&call, user_id).await;
    if !result.success {
        let error = result
            .error
            .clone()
            .unwrap_or_else(|| "Falha ao executar a consulta".to_string());
        let message = if reply.message.trim().is_empty() {
            error.clone()
        } else {
            reply.message
        };
        // Handled business failure: the conversation continues, so 200.
        return (
            StatusCode::OK,
            Json(ChatResponseBody {
                message,
                error: Some(error),
                ..Default::default()
            }),
        );
    }

    let data = result.data.clone().unwrap_or(Value::Null);
    let formatted = state.formatter.format(&call.name, &reply.message, &data);
    let suggestions = state.suggestions.suggest(&call.name, &data);
    let context_field = (call.name == "gerar_mensagem").then(|| {
        json!({
            "clientId": data.get("clientId").cloned().unwrap_or(Value::Null),
            "clientName": data.get("clientName").cloned().unwrap_or(Value::Null),
        })
    });

    (
        StatusCode::OK,
        Json(ChatResponseBody {
            message: formatted,
            suggested_actions: non_empty(suggestions),
            result: Some(result),
            context: context_field,
            ..Default::default()
        }),
    )
}

fn non_empty(actions: Vec<SuggestedAction>) -> Option<Vec<SuggestedAction>> {
    if actions.is_empty() { None } else { Some(actions) }
}
