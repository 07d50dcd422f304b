//! Fallback chat messages for pending confirmations, used when the model's
//! own turn text is empty.

use cp_tools::ConfirmationType;

pub fn compose(tool_name: &str, confirmation_type: Option<ConfirmationType>) -> String {
    match confirmation_type {
        Some(ConfirmationType::Meeting) => {
            "Perfeito! Confirme os detalhes da reunião abaixo:".to_string()
        }
        Some(ConfirmationType::MeetingDelete) => {
            "Encontrei a reunião. Confirma o cancelamento?".to_string()
        }
        Some(ConfirmationType::MeetingUpdate) => {
            "Confira os novos detalhes e confirme o reagendamento:".to_string()
        }
        Some(ConfirmationType::Task) => {
            "Anotei! Confirme a criação da tarefa:".to_string()
        }
        Some(ConfirmationType::Whatsapp) => {
            "Preparei a mensagem. Revise antes de enviar:".to_string()
        }
        Some(ConfirmationType::Payment) => {
            "Confirme os dados do pagamento antes de registrar:".to_string()
        }
        Some(ConfirmationType::Reminder) => {
            "Confirme o lembrete abaixo:".to_string()
        }
        Some(ConfirmationType::ClientSelect) => {
            "Encontrei mais de um cliente. Qual deles você quis dizer?".to_string()
        }
        Some(ConfirmationType::Generic) | None => {
            format!("Confirma a ação {tool_name}?")
        }
    }
}
