use cp_llm::ToolDefinition;
use serde_json::json;

/// Full action catalog advertised to the model: read-only queries plus the
/// side-effecting actions that go through the confirmation flow.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        def(
            "listar_clientes",
            "Lista os clientes da agência.",
            json!({ "type": "object", "properties": {} }),
        ),
        def(
            "buscar_cliente",
            "Busca clientes pelo nome.",
            json!({
                "type": "object",
                "properties": { "nome": { "type": "string" } },
                "required": ["nome"]
            }),
        ),
        def(
            "listar_reunioes",
            "Lista as próximas reuniões agendadas.",
            json!({ "type": "object", "properties": {} }),
        ),
        def(
            "listar_tarefas",
            "Lista as tarefas pendentes.",
            json!({ "type": "object", "properties": {} }),
        ),
        def(
            "listar_pagamentos",
            "Lista os pagamentos pendentes, incluindo atrasados.",
            json!({ "type": "object", "properties": {} }),
        ),
        def(
            "resumo_dia",
            "Resumo do dia: reuniões, tarefas e pagamentos.",
            json!({ "type": "object", "properties": {} }),
        ),
        def(
            "resumo_cliente",
            "Resumo de um cliente específico.",
            json!({
                "type": "object",
                "properties": { "clientId": { "type": "string" }, "nome": { "type": "string" } }
            }),
        ),
        def(
            "analisar_performance",
            "Análise geral da carteira de clientes.",
            json!({ "type": "object", "properties": {} }),
        ),
        def(
            "gerar_mensagem",
            "Gera um rascunho de mensagem para um cliente.",
            json!({
                "type": "object",
                "properties": {
                    "clientId": { "type": "string" },
                    "objetivo": { "type": "string" }
                },
                "required": ["clientId"]
            }),
        ),
        def(
            "agendar_reuniao",
            "Agenda uma reunião com um cliente (requer confirmação).",
            json!({
                "type": "object",
                "properties": {
                    "clientId": { "type": "string" },
                    "date": { "type": "string", "description": "YYYY-MM-DD" },
                    "time": { "type": "string", "description": "HH:MM" },
                    "type": { "type": "string", "enum": ["online", "presencial"] },
                    "notes": { "type": "string" }
                },
                "required": ["clientId", "date", "time"]
            }),
        ),
        def(
            "cancelar_reuniao",
            "Cancela uma reunião existente (requer confirmação).",
            json!({
                "type": "object",
                "properties": {
                    "meetingId": { "type": "string" },
                    "clientId": { "type": "string" },
                    "date": { "type": "string", "description": "YYYY-MM-DD" }
                }
            }),
        ),
        def(
            "reagendar_reuniao",
            "Reagenda uma reunião existente (requer confirmação).",
            json!({
                "type": "object",
                "properties": {
                    "meetingId": { "type": "string" },
                    "clientId": { "type": "string" },
                    "date": { "type": "string" },
                    "newDate": { "type": "string" },
                    "newTime": { "type": "string" },
                    "newType": { "type": "string" }
                }
            }),
        ),
        def(
            "criar_tarefa",
            "Cria uma tarefa (requer confirmação).",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "clientId": { "type": "string" },
                    "dueDate": { "type": "string" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "category": { "type": "string" }
                },
                "required": ["title"]
            }),
        ),
        def(
            "enviar_whatsapp",
            "Envia uma mensagem de WhatsApp para um cliente (requer confirmação).",
            json!({
                "type": "object",
                "properties": {
                    "clientId": { "type": "string" },
                    "message": { "type": "string" }
                },
                "required": ["clientId", "message"]
            }),
        ),
        def(
            "registrar_pagamento",
            "Registra uma cobrança para um cliente (requer confirmação).",
            json!({
                "type": "object",
                "properties": {
                    "clientId": { "type": "string" },
                    "amount": { "type": "number" },
                    "dueDate": { "type": "string" },
                    "description": { "type": "string" }
                },
                "required": ["clientId", "amount", "dueDate"]
            }),
        ),
        def(
            "criar_lembrete",
            "Cria um lembrete (requer confirmação).",
            json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "date": { "type": "string" },
                    "time": { "type": "string" },
                    "clientId": { "type": "string" }
                },
                "required": ["message", "date"]
            }),
        ),
    ]
}

fn def(name: &str, description: &str, parameters: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::tool_requires_confirmation;

    #[test]
    fn catalog_names_are_unique() {
        let defs = tool_definitions();
        let mut names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), defs.len());
    }

    #[test]
    fn confirmable_tools_say_so_in_their_description() {
        for d in tool_definitions() {
            if tool_requires_confirmation(&d.name) {
                assert!(
                    d.description.contains("requer confirmação"),
                    "{} should mention confirmation",
                    d.name
                );
            }
        }
    }
}
