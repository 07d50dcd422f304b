use serde::{Deserialize, Serialize};

/// Closed category that fixes the shape of a confirmation payload. A tool
/// whose name has no entry in the decision table falls through to `Generic`,
/// which is always renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationType {
    Meeting,
    MeetingDelete,
    MeetingUpdate,
    Task,
    Whatsapp,
    Payment,
    Reminder,
    ClientSelect,
    Generic,
}

/// Decision table: does this tool perform a side effect that must be approved
/// by a human before execution? Read-only queries run immediately.
pub fn tool_requires_confirmation(tool_name: &str) -> bool {
    confirmation_type_for(tool_name).is_some()
}

pub fn confirmation_type_for(tool_name: &str) -> Option<ConfirmationType> {
    match tool_name {
        "agendar_reuniao" => Some(ConfirmationType::Meeting),
        "cancelar_reuniao" => Some(ConfirmationType::MeetingDelete),
        "reagendar_reuniao" => Some(ConfirmationType::MeetingUpdate),
        "criar_tarefa" => Some(ConfirmationType::Task),
        "enviar_whatsapp" => Some(ConfirmationType::Whatsapp),
        "registrar_pagamento" => Some(ConfirmationType::Payment),
        "criar_lembrete" => Some(ConfirmationType::Reminder),
        "selecionar_cliente" => Some(ConfirmationType::ClientSelect),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_tools_do_not_require_confirmation() {
        for name in [
            "listar_clientes",
            "buscar_cliente",
            "listar_reunioes",
            "listar_tarefas",
            "listar_pagamentos",
            "resumo_dia",
            "gerar_mensagem",
        ] {
            assert!(!tool_requires_confirmation(name), "{name}");
        }
    }

    #[test]
    fn side_effecting_tools_map_to_their_type() {
        assert_eq!(
            confirmation_type_for("agendar_reuniao"),
            Some(ConfirmationType::Meeting)
        );
        assert_eq!(
            confirmation_type_for("cancelar_reuniao"),
            Some(ConfirmationType::MeetingDelete)
        );
        assert_eq!(
            confirmation_type_for("reagendar_reuniao"),
            Some(ConfirmationType::MeetingUpdate)
        );
        assert_eq!(
            confirmation_type_for("enviar_whatsapp"),
            Some(ConfirmationType::Whatsapp)
        );
        assert_eq!(confirmation_type_for("inexistente"), None);
    }

    #[test]
    fn confirmation_type_serializes_snake_case() {
        let json = serde_json::to_string(&ConfirmationType::MeetingDelete).expect("serialize");
        assert_eq!(json, "\"meeting_delete\"");
    }
}
