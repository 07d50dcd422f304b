//! Turns raw query payloads into the Portuguese chat text the dashboard
//! renders. Registry keyed by tool name with an explicit default handler;
//! the model's own turn text always wins when present.

use serde_json::Value;
use std::collections::HashMap;

const MEETINGS_LIMIT: usize = 5;
const CLIENTS_LIMIT: usize = 10;
const TASKS_LIMIT: usize = 5;
const PAYMENTS_LIMIT: usize = 8;

type FormatFn = fn(&Value) -> String;

pub struct ResultFormatter {
    handlers: HashMap<&'static str, FormatFn>,
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, FormatFn> = HashMap::new();
        handlers.insert("listar_clientes", format_clients);
        handlers.insert("buscar_cliente", format_client_search);
        handlers.insert("listar_reunioes", format_meetings);
        handlers.insert("listar_tarefas", format_tasks);
        handlers.insert("listar_pagamentos", format_payments);
        handlers.insert("resumo_dia", format_resumo);
        handlers.insert("resumo_cliente", format_resumo);
        handlers.insert("analisar_performance", format_analise);
        handlers.insert("gerar_mensagem", format_generated_message);
        Self { handlers }
    }

    /// `model_message` is whatever the assistant said alongside the tool
    /// call; non-empty text is returned verbatim.
    pub fn format(&self, tool_name: &str, model_message: &str, data: &Value) -> String {
        let trimmed = model_message.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
        match self.handlers.get(tool_name) {
            Some(handler) => handler(data),
            None => format_default(data),
        }
    }
}

fn format_default(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "Consulta realizada com sucesso.".to_string())
}

fn format_clients(data: &Value) -> String {
    let clients = list(data, "clients");
    if clients.is_empty() {
        return "Você ainda não tem clientes cadastrados.".to_string();
    }

    let mut out = format!("Você tem {} cliente(s):\n", clients.len());
    for client in clients.iter().take(CLIENTS_LIMIT) {
        let name = field(client, "name").unwrap_or("Cliente");
        match field(client, "segment") {
            Some(segment) => out.push_str(&format!("• {name} ({segment})\n")),
            None => out.push_str(&format!("• {name}\n")),
        }
    }
    if clients.len() > CLIENTS_LIMIT {
        out.push_str(&format!(
            "... e mais {} cliente(s)",
            clients.len() - CLIENTS_LIMIT
        ));
    }
    out.trim_end().to_string()
}

/// `buscar_cliente` historically returned a list and later a single object;
/// accept both shapes.
fn format_client_search(data: &Value) -> String {
    // A null single-object shape means "no match", not an empty card.
    let matches: Vec<&Value> = match data.get("client").filter(|v| !v.is_null()) {
        Some(client) => vec![client],
        None => list(data, "clients").iter().collect(),
    };

    match matches.as_slice() {
        [] => "Não encontrei nenhum cliente com esse nome.".to_string(),
        [client] => {
            let name = field(client, "name").unwrap_or("Cliente");
            let mut out = format!("Encontrei: **{name}**\n");
            if let Some(contact) = field(client, "contactName") {
                out.push_str(&format!("Contato: {contact}\n"));
            }
            if let Some(phone) = field(client, "phone") {
                out.push_str(&format!("Telefone: {phone}\n"));
            }
            if let Some(segment) = field(client, "segment") {
                out.push_str(&format!("Segmento: {segment}\n"));
            }
            if let Some(status) = field(client, "status") {
                out.push_str(&format!("Status: {status}\n"));
            }
            out.trim_end().to_string()
        }
        many => {
            let mut out = format!("Encontrei {} clientes:\n", many.len());
            for client in many {
                out.push_str(&format!("• {}\n", field(client, "name").unwrap_or("Cliente")));
            }
            out.trim_end().to_string()
        }
    }
}

fn format_meetings(data: &Value) -> String {
    let meetings = list(data, "meetings");
    if meetings.is_empty() {
        return "Nenhuma reunião agendada. 📅".to_string();
    }

    let mut out = format!("Você tem {} reunião(ões):\n", meetings.len());
    for meeting in meetings.iter().take(MEETINGS_LIMIT) {
        let client = field(meeting, "clientName").unwrap_or("Cliente");
        let date = field(meeting, "date").unwrap_or("");
        let time = field(meeting, "time").unwrap_or("");
        out.push_str(&format!("• {date} às {time} — {client}"));
        if let Some(kind) = field(meeting, "type") {
            out.push_str(&format!(" ({kind})"));
        }
        out.push('\n');
    }
    if meetings.len() > MEETINGS_LIMIT {
        out.push_str(&format!(
            "... e mais {} reunião(ões)",
            meetings.len() - MEETINGS_LIMIT
        ));
    }
    out.trim_end().to_string()
}

fn format_tasks(data: &Value) -> String {
    let tasks = list(data, "tasks");
    if tasks.is_empty() {
        return "Nenhuma tarefa pendente. Tudo em dia! ✅".to_string();
    }

    let mut out = format!("Você tem {} tarefa(s) pendente(s):\n", tasks.len());
    for task in tasks.iter().take(TASKS_LIMIT) {
        let icon = match field(task, "priority") {
            Some("high") => "🔴",
            Some("low") => "🟢",
            _ => "🟡",
        };
        let title = field(task, "title").unwrap_or("(sem título)");
        out.push_str(&format!("{icon} {title}"));
        if let Some(due) = field(task, "dueDate") {
            out.push_str(&format!(" — vence {due}"));
        }
        out.push('\n');
    }
    if tasks.len() > TASKS_LIMIT {
        out.push_str(&format!("... e mais {} tarefa(s)", tasks.len() - TASKS_LIMIT));
    }
    out.trim_end().to_string()
}

fn format_payments(data: &Value) -> String {
    let payments = list(data, "payments");
    if payments.is_empty() {
        return "Nenhum pagamento pendente. Tudo em dia! ✅".to_string();
    }

    let mut out = format!("Você tem {} pagamento(s) pendente(s):\n", payments.len());
    for payment in payments.iter().take(PAYMENTS_LIMIT) {
        let client = field(payment, "clientName").unwrap_or("Cliente");
        let amount = payment
            .get("amount")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let due = field(payment, "dueDate").unwrap_or("");
        out.push_str(&format!("• {client}: {} — vence {due}", format_amount(amount)));
        let overdue = payment
            .get("daysOverdue")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if overdue > 0 {
            out.push_str(&format!(" ⚠️ {overdue} dia(s) em atraso"));
        }
        out.push('\n');
    }
    if payments.len() > PAYMENTS_LIMIT {
        out.push_str(&format!(
            "... e mais {} pagamento(s)",
            payments.len() - PAYMENTS_LIMIT
        ));
    }
    out.trim_end().to_string()
}

/// The generated message is quoted for the user, with the client reference
/// kept in an HTML comment so a follow-up "envia pra ele" can recover who
/// the message was written for.
fn format_generated_message(data: &Value) -> String {
    let message = field(data, "mensagem").unwrap_or("");
    if message.is_empty() {
        return "Não consegui gerar a mensagem.".to_string();
    }
    let mut out = format!("Aqui está a mensagem:\n\n> {}", message.replace('\n', "\n> "));
    if let (Some(id), Some(name)) = (field(data, "clientId"), field(data, "clientName")) {
        out.push_str(&format!("\n\n<!-- client:{id}:{name} -->"));
    }
    out
}

fn format_resumo(data: &Value) -> String {
    passthrough(data, "resumo")
}

fn format_analise(data: &Value) -> String {
    passthrough(data, "analise")
}

fn passthrough(data: &Value, key: &str) -> String {
    field(data, key)
        .map(str::to_string)
        .unwrap_or_else(|| "Consulta realizada com sucesso.".to_string())
}

fn format_amount(amount: f64) -> String {
    format!("R$ {:.2}", amount).replace('.', ",")
}

fn list<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn format_result(tool_name: &str, model_message: &str, data: &Value) -> String {
        ResultFormatter::new().format(tool_name, model_message, data)
    }

    #[test]
    fn model_message_wins_over_formatter() {
        let data = json!({ "payments": [] });
        assert_eq!(
            format_result("listar_pagamentos", "Segue a lista:", &data),
            "Segue a lista:"
        );
    }

    #[test]
    fn payments_truncate_at_eight_with_suffix() {
        let payments: Vec<_> = (0..11)
            .map(|i| {
                json!({
                    "clientName": format!("Cliente {i}"),
                    "amount": 100.0 + i as f64,
                    "dueDate": "2025-01-10",
                    "daysOverdue": 0
                })
            })
            .collect();
        let out = format_result("listar_pagamentos", "", &json!({ "payments": payments }));
        assert!(out.contains("11 pagamento(s)"));
        assert!(out.contains("Cliente 7"));
        assert!(!out.contains("Cliente 8:"));
        assert!(out.ends_with("... e mais 3 pagamento(s)"));
    }

    #[test]
    fn overdue_payment_gets_warning_marker() {
        let data = json!({ "payments": [
            { "clientName": "ACME", "amount": 1500.0, "dueDate": "2025-01-01", "daysOverdue": 12 }
        ]});
        let out = format_result("listar_pagamentos", "", &data);
        assert!(out.contains("R$ 1500,00"));
        assert!(out.contains("⚠️ 12 dia(s) em atraso"));
    }

    #[test]
    fn empty_payments_says_all_clear() {
        let out = format_result("listar_pagamentos", "", &json!({ "payments": [] }));
        assert_eq!(out, "Nenhum pagamento pendente. Tudo em dia! ✅");
    }

    #[test]
    fn client_search_accepts_single_object_shape() {
        let data = json!({ "client": {
            "name": "ACME", "contactName": "Joana", "phone": "+5511999990000"
        }});
        let out = format_result("buscar_cliente", "", &data);
        assert!(out.contains("**ACME**"));
        assert!(out.contains("Contato: Joana"));
        assert!(out.contains("Telefone: +5511999990000"));
        assert!(!out.contains("Segmento"));
    }

    #[test]
    fn client_search_with_no_match() {
        let out = format_result("buscar_cliente", "", &json!({ "clients": [] }));
        assert_eq!(out, "Não encontrei nenhum cliente com esse nome.");
    }

    #[test]
    fn null_client_object_reads_as_no_match() {
        let out = format_result("buscar_cliente", "", &json!({ "client": null }));
        assert_eq!(out, "Não encontrei nenhum cliente com esse nome.");
    }

    #[test]
    fn generated_message_carries_client_marker() {
        let data = json!({
            "mensagem": "Olá Joana!\nTudo bem?",
            "clientId": "c1",
            "clientName": "ACME"
        });
        let out = format_result("gerar_mensagem", "", &data);
        assert!(out.contains("> Olá Joana!\n> Tudo bem?"));
        assert!(out.contains("<!-- client:c1:ACME -->"));
    }

    #[test]
    fn summary_tools_pass_text_through() {
        let out = format_result("resumo_dia", "", &json!({ "resumo": "Dia tranquilo." }));
        assert_eq!(out, "Dia tranquilo.");
        let out = format_result(
            "analisar_performance",
            "",
            &json!({ "analise": "Crescimento de 10%." }),
        );
        assert_eq!(out, "Crescimento de 10%.");
    }

    #[test]
    fn unknown_tool_uses_generic_fallback() {
        let out = format_result("nova_consulta", "", &json!({}));
        assert_eq!(out, "Consulta realizada com sucesso.");
    }

    #[test]
    fn meetings_list_includes_type_when_present() {
        let data = json!({ "meetings": [
            { "clientName": "ACME", "date": "2025-01-10", "time": "14:00", "type": "online" }
        ]});
        let out = format_result("listar_reunioes", "", &data);
        assert!(out.contains("• 2025-01-10 às 14:00 — ACME (online)"));
    }
}
