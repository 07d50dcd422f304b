//! Proactive next-step suggestions after an executed query. Registry keyed
//! by tool name with an explicit default handler; urgency signals (overdue
//! payments, next meeting) come before plain navigation.

use cp_llm::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use uuid::Uuid;

/// Hard cap from the UI contract: a chat turn never renders more than three
/// suggestion chips.
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAction {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub action: ActionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ActionKind {
    Navigate { path: String },
    Tool { tool_call: ToolCall },
    Callback { callback_id: String },
}

pub fn navigate(label: impl Into<String>, icon: &str, path: &str) -> SuggestedAction {
    SuggestedAction {
        id: Uuid::new_v4().to_string(),
        label: label.into(),
        icon: icon.to_string(),
        action: ActionKind::Navigate {
            path: path.to_string(),
        },
    }
}

fn tool(label: impl Into<String>, icon: &str, name: &str, arguments: Value) -> SuggestedAction {
    SuggestedAction {
        id: Uuid::new_v4().to_string(),
        label: label.into(),
        icon: icon.to_string(),
        action: ActionKind::Tool {
            tool_call: ToolCall {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                arguments,
            },
        },
    }
}

fn callback(label: impl Into<String>, icon: &str, callback_id: String) -> SuggestedAction {
    SuggestedAction {
        id: Uuid::new_v4().to_string(),
        label: label.into(),
        icon: icon.to_string(),
        action: ActionKind::Callback { callback_id },
    }
}

type SuggestFn = fn(&Value) -> Vec<SuggestedAction>;

pub struct SuggestionEngine {
    handlers: HashMap<&'static str, SuggestFn>,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionEngine {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, SuggestFn> = HashMap::new();
        handlers.insert("listar_pagamentos", suggest_pagamentos);
        handlers.insert("listar_reunioes", suggest_reunioes);
        handlers.insert("listar_clientes", suggest_clientes);
        handlers.insert("buscar_cliente", suggest_buscar_cliente);
        handlers.insert("listar_tarefas", suggest_tarefas);
        handlers.insert("resumo_dia", suggest_resumo_dia);
        Self { handlers }
    }

    pub fn suggest(&self, tool_name: &str, data: &Value) -> Vec<SuggestedAction> {
        let mut out = match self.handlers.get(tool_name) {
            Some(handler) => handler(data),
            None => vec![navigate("Ir para o dashboard", "home", "/")],
        };
        out.truncate(MAX_SUGGESTIONS);
        out
    }
}

fn suggest_pagamentos(data: &Value) -> Vec<SuggestedAction> {
    let mut out = Vec::new();
    let payments = list(data, "payments");

    // Most overdue client first, before any navigation filler.
    let most_overdue = payments
        .iter()
        .filter(|p| p["daysOverdue"].as_i64().unwrap_or(0) > 0)
        .max_by_key(|p| p["daysOverdue"].as_i64().unwrap_or(0));
    if let Some(p) = most_overdue {
        let client_name = p["clientName"].as_str().unwrap_or("Cliente");
        let client_id = p["clientId"].as_str().unwrap_or_default();
        out.push(tool(
            format!("Cobrar {client_name}"),
            "message-circle",
            "enviar_whatsapp",
            json!({ "clientId": client_id }),
        ));
    }
    out.push(navigate("Ver financeiro", "dollar-sign", "/financeiro"));
    out
}

fn suggest_reunioes(data: &Value) -> Vec<SuggestedAction> {
    let mut out = Vec::new();
    if let Some(next) = list(data, "meetings").first() {
        let client_name = next["clientName"].as_str().unwrap_or("Cliente");
        let client_id = next["clientId"].as_str().unwrap_or_default();
        out.push(tool(
            format!("Enviar lembrete para {client_name}"),
            "bell",
            "enviar_whatsapp",
            json!({ "clientId": client_id }),
        ));
    }
    out.push(navigate("Ver calendário", "calendar", "/calendario"));
    out
}

fn suggest_clientes(data: &Value) -> Vec<SuggestedAction> {
    let mut out = Vec::new();
    // Scheduling needs at least one client to schedule with.
    if let Some(first) = list(data, "clients").first() {
        let name = first["name"].as_str().unwrap_or("Cliente");
        let id = first["id"].as_str().unwrap_or_default();
        out.push(tool(
            format!("Agendar reunião com {name}"),
            "calendar",
            "agendar_reuniao",
            json!({ "clientId": id }),
        ));
    }
    out.push(navigate("Ver todos os clientes", "users", "/clientes"));
    out
}

fn suggest_buscar_cliente(data: &Value) -> Vec<SuggestedAction> {
    let mut out = Vec::new();
    let clients = list(data, "clients");
    if clients.len() == 1 {
        let name = clients[0]["name"].as_str().unwrap_or("Cliente");
        let id = clients[0]["id"].as_str().unwrap_or_default();
        out.push(tool(
            format!("Gerar mensagem para {name}"),
            "message-circle",
            "gerar_mensagem",
            json!({ "clientId": id }),
        ));
    }
    out.push(navigate("Ver clientes", "users", "/clientes"));
    out
}

fn suggest_tarefas(data: &Value) -> Vec<SuggestedAction> {
    let mut out = Vec::new();
    if let Some(first) = list(data, "tasks").first() {
        let title = first["title"].as_str().unwrap_or("tarefa");
        let id = first["id"].as_str().unwrap_or_default();
        out.push(callback(
            format!("Concluir: {title}"),
            "check-circle",
            format!("complete-task:{id}"),
        ));
    }
    out.push(navigate("Ver tarefas", "check-circle", "/tarefas"));
    out
}

fn suggest_resumo_dia(_data: &Value) -> Vec<SuggestedAction> {
    vec![
        navigate("Ver calendário", "calendar", "/calendario"),
        navigate("Ver tarefas", "check-circle", "/tarefas"),
    ]
}

fn list<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_more_than_three_suggestions() {
        let engine = SuggestionEngine::new();
        let data = json!({
            "payments": [
                { "clientId": "c1", "clientName": "A", "daysOverdue": 5 },
                { "clientId": "c2", "clientName": "B", "daysOverdue": 9 },
                { "clientId": "c3", "clientName": "C", "daysOverdue": 1 },
                { "clientId": "c4", "clientName": "D", "daysOverdue": 2 },
            ]
        });
        assert!(engine.suggest("listar_pagamentos", &data).len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn overdue_collection_comes_before_navigation() {
        let engine = SuggestionEngine::new();
        let data = json!({
            "payments": [
                { "clientId": "c1", "clientName": "ACME", "daysOverdue": 5 },
                { "clientId": "c2", "clientName": "Beta", "daysOverdue": 0 },
            ]
        });
        let suggestions = engine.suggest("listar_pagamentos", &data);
        assert_eq!(suggestions[0].label, "Cobrar ACME");
        assert!(matches!(suggestions[0].action, ActionKind::Tool { .. }));
        assert!(matches!(suggestions[1].action, ActionKind::Navigate { .. }));
    }

    #[test]
    fn no_clients_means_only_the_navigation_entry() {
        let engine = SuggestionEngine::new();
        let suggestions = engine.suggest("listar_clientes", &json!({ "clients": [] }));
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].label, "Ver todos os clientes");
    }

    #[test]
    fn unknown_tools_fall_back_to_dashboard() {
        let engine = SuggestionEngine::new();
        let suggestions = engine.suggest("ferramenta_x", &json!({}));
        assert_eq!(suggestions.len(), 1);
        assert!(matches!(
            &suggestions[0].action,
            ActionKind::Navigate { path } if path == "/"
        ));
    }
}
