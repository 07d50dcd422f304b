//! Confirmation building: resolves the entities a tool call references and
//! produces the typed, UI-ready payload a human approves before anything
//! executes. Total by design: unresolved lookups degrade to fallback values,
//! never to an error, so a confirmation card is always renderable.

use crate::context::UserContext;
use chrono::{DateTime, Utc};
use cp_llm::ToolCall;
use cp_tools::{Client, ConfirmationType, Meeting, Store};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const CLIENT_FALLBACK: &str = "Cliente";

/// Deferred, human-approvable representation of a tool call. `status` is
/// always `"pending"` here; only the approval endpoint transitions it and
/// reads `tool_to_execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationData {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub confirmation_type: ConfirmationType,
    pub status: String,
    pub data: ConfirmationPayload,
    pub tool_to_execute: ToolCall,
    pub created_at: DateTime<Utc>,
}

/// One variant per [`ConfirmationType`]; the pairing is fixed at construction
/// so envelope type and payload shape can never disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum ConfirmationPayload {
    #[serde(rename_all = "camelCase")]
    Meeting {
        client_id: String,
        client_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        contact_name: Option<String>,
        date: String,
        time: String,
        #[serde(rename = "type")]
        meeting_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MeetingDelete {
        meeting_id: String,
        client_id: String,
        client_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        contact_name: Option<String>,
        date: String,
        time: String,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        meeting_type: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MeetingUpdate {
        meeting_id: String,
        client_id: String,
        client_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        contact_name: Option<String>,
        date: String,
        time: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_date: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_time: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_type: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Task {
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_name: Option<String>,
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        due_date: Option<String>,
        priority: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Whatsapp {
        client_id: String,
        client_name: String,
        contact_name: String,
        phone: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Payment {
        client_id: String,
        client_name: String,
        amount: f64,
        due_date: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Reminder {
        message: String,
        date: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ClientSelect {
        query: String,
        /// Populated by the disambiguation caller, not here.
        candidates: Vec<Client>,
        original_request: String,
        pending_tool: ToolCall,
    },
    #[serde(rename_all = "camelCase")]
    Generic {
        title: String,
        description: String,
        details: Value,
    },
}

impl ConfirmationPayload {
    pub fn confirmation_type(&self) -> ConfirmationType {
        match self {
            Self::Meeting { .. } => ConfirmationType::Meeting,
            Self::MeetingDelete { .. } => ConfirmationType::MeetingDelete,
            Self::MeetingUpdate { .. } => ConfirmationType::MeetingUpdate,
            Self::Task { .. } => ConfirmationType::Task,
            Self::Whatsapp { .. } => ConfirmationType::Whatsapp,
            Self::Payment { .. } => ConfirmationType::Payment,
            Self::Reminder { .. } => ConfirmationType::Reminder,
            Self::ClientSelect { .. } => ConfirmationType::ClientSelect,
            Self::Generic { .. } => ConfirmationType::Generic,
        }
    }
}

/// Builds the confirmation for a tool call. `confirmation_type` comes from
/// the policy table; `None` (tool known to need approval but without a
/// dedicated card) lands on the generic variant.
#[tracing::instrument(level = "info", skip_all, fields(tool_name = %call.name, user_id = %user_id))]
pub async fn build_confirmation(
    store: &dyn Store,
    call: &ToolCall,
    confirmation_type: Option<ConfirmationType>,
    context: &UserContext,
    user_id: &str,
) -> ConfirmationData {
    let params = &call.arguments;
    let client = resolve_client(params, context);
    let meeting = match confirmation_type {
        Some(ConfirmationType::MeetingDelete) | Some(ConfirmationType::MeetingUpdate) => {
            resolve_meeting(store, params, user_id).await
        }
        _ => None,
    };

    let payload = build_payload(call, confirmation_type, client, meeting);
    ConfirmationData {
        id: Uuid::new_v4(),
        confirmation_type: payload.confirmation_type(),
        status: "pending".to_string(),
        data: payload,
        tool_to_execute: call.clone(),
        created_at: Utc::now(),
    }
}

fn build_payload(
    call: &ToolCall,
    confirmation_type: Option<ConfirmationType>,
    client: Option<&Client>,
    meeting: Option<Meeting>,
) -> ConfirmationPayload {
    let params = &call.arguments;
    let client_name = || {
        client
            .map(|c| c.name.clone())
            .or_else(|| str_param(params, "clientName"))
            .unwrap_or_else(|| CLIENT_FALLBACK.to_string())
    };
    let contact_name = || client.and_then(|c| c.contact_name.clone());

    match confirmation_type {
        Some(ConfirmationType::Meeting) => ConfirmationPayload::Meeting {
            client_id: str_param_or(params, "clientId", ""),
            client_name: client_name(),
            contact_name: contact_name(),
            date: str_param_or(params, "date", ""),
            time: str_param_or(params, "time", ""),
            meeting_type: str_param_or(params, "type", "online"),
            notes: str_param(params, "notes"),
        },
        Some(ConfirmationType::MeetingDelete) => {
            // Resolved meeting wins over raw parameters, which win over the
            // client lookup.
            let m = meeting.as_ref();
            ConfirmationPayload::MeetingDelete {
                meeting_id: m
                    .map(|m| m.id.clone())
                    .or_else(|| str_param(params, "meetingId"))
                    .unwrap_or_default(),
                client_id: m
                    .map(|m| m.client_id.clone())
                    .or_else(|| str_param(params, "clientId"))
                    .unwrap_or_default(),
                client_name: m.map(|m| m.client_name.clone()).unwrap_or_else(client_name),
                contact_name: m.and_then(|m| m.contact_name.clone()).or_else(contact_name),
                date: m
                    .map(|m| m.date.clone())
                    .or_else(|| date_param(params))
                    .unwrap_or_default(),
                time: m
                    .map(|m| m.time.clone())
                    .or_else(|| str_param(params, "time"))
                    .unwrap_or_default(),
                meeting_type: m
                    .map(|m| m.meeting_type.clone())
                    .or_else(|| str_param(params, "type")),
            }
        }
        Some(ConfirmationType::MeetingUpdate) => {
            let m = meeting.as_ref();
            ConfirmationPayload::MeetingUpdate {
                meeting_id: m
                    .map(|m| m.id.clone())
                    .or_else(|| str_param(params, "meetingId"))
                    .unwrap_or_default(),
                client_id: m
                    .map(|m| m.client_id.clone())
                    .or_else(|| str_param(params, "clientId"))
                    .unwrap_or_default(),
                client_name: m.map(|m| m.client_name.clone()).unwrap_or_else(client_name),
                contact_name: m.and_then(|m| m.contact_name.clone()).or_else(contact_name),
                date: m
                    .map(|m| m.date.clone())
                    .or_else(|| date_param(params))
                    .unwrap_or_default(),
                time: m
                    .map(|m| m.time.clone())
                    .or_else(|| str_param(params, "time"))
                    .unwrap_or_default(),
                // Taken verbatim; the approval endpoint validates them.
                new_date: str_param(params, "newDate"),
                new_time: str_param(params, "newTime"),
                new_type: str_param(params, "newType"),
            }
        }
        Some(ConfirmationType::Task) => ConfirmationPayload::Task {
            client_id: str_param(params, "clientId"),
            client_name: client.map(|c| c.name.clone()),
            title: str_param_or(params, "title", ""),
            description: str_param(params, "description"),
            due_date: str_param(params, "dueDate"),
            priority: str_param_or(params, "priority", "medium"),
            category: str_param(params, "category"),
        },
        Some(ConfirmationType::Whatsapp) => {
            let name = client_name();
            ConfirmationPayload::Whatsapp {
                client_id: str_param_or(params, "clientId", ""),
                contact_name: contact_name().unwrap_or_else(|| name.clone()),
                client_name: name,
                phone: client
                    .and_then(|c| c.phone.clone())
                    .or_else(|| str_param(params, "phone"))
                    .unwrap_or_default(),
                message: str_param_or(params, "message", ""),
            }
        }
        Some(ConfirmationType::Payment) => ConfirmationPayload::Payment {
            client_id: str_param_or(params, "clientId", ""),
            client_name: client_name(),
            amount: f64_param(params, "amount"),
            due_date: str_param_or(params, "dueDate", ""),
            description: str_param(params, "description"),
        },
        Some(ConfirmationType::Reminder) => ConfirmationPayload::Reminder {
            message: str_param_or(params, "message", ""),
            date: str_param_or(params, "date", ""),
            time: str_param(params, "time"),
            client_id: str_param(params, "clientId"),
            client_name: client.map(|c| c.name.clone()),
        },
        Some(ConfirmationType::ClientSelect) => ConfirmationPayload::ClientSelect {
            query: str_param(params, "query")
                .or_else(|| str_param(params, "nome"))
                .unwrap_or_default(),
            candidates: vec![],
            original_request: String::new(),
            pending_tool: call.clone(),
        },
        Some(ConfirmationType::Generic) | None => ConfirmationPayload::Generic {
            title: format!("Confirmar: {}", call.name),
            description: "Deseja executar esta ação?".to_string(),
            details: params.clone(),
        },
    }
}

fn resolve_client<'a>(params: &Value, context: &'a UserContext) -> Option<&'a Client> {
    let client_id = str_param(params, "clientId")?;
    context.clients.iter().find(|c| c.id == client_id)
}

/// Meeting mutations usually arrive with only a client/date pair; look the
/// meeting up live so the card shows what will actually be touched. Storage
/// failures degrade to `None` rather than aborting the request.
async fn resolve_meeting(store: &dyn Store, params: &Value, user_id: &str) -> Option<Meeting> {
    if let Some(meeting_id) = str_param(params, "meetingId") {
        match store.meeting_by_id(user_id, &meeting_id).await {
            Ok(found) => return found,
            Err(e) => {
                tracing::warn!(error = %e, "meeting lookup by id failed; building degraded confirmation");
                return None;
            }
        }
    }

    let client_id = str_param(params, "clientId")?;
    let date = date_param(params)?;
    match store
        .meetings_for_client_on_date(user_id, &client_id, &date)
        .await
    {
        // Store orders by created_at DESC; the head is the tie-break winner.
        Ok(meetings) => meetings.into_iter().next(),
        Err(e) => {
            tracing::warn!(error = %e, "meeting lookup by client+date failed; building degraded confirmation");
            None
        }
    }
}

fn date_param(params: &Value) -> Option<String> {
    str_param(params, "date").or_else(|| str_param(params, "currentDate"))
}

fn str_param(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn str_param_or(params: &Value, key: &str, default: &str) -> String {
    str_param(params, key).unwrap_or_else(|| default.to_string())
}

/// Accepts a JSON number or a numeric string; anything else is 0.
fn f64_param(params: &Value, key: &str) -> f64 {
    match params.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_tools::MemoryStore;
    use serde_json::json;

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "tc1".to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    fn context_with_acme() -> UserContext {
        UserContext {
            clients: vec![Client {
                id: "c1".to_string(),
                name: "ACME".to_string(),
                contact_name: Some("Joana".to_string()),
                phone: Some("+5511999990000".to_string()),
                segment: None,
                status: None,
            }],
            ..Default::default()
        }
    }

    fn meeting(id: &str, client_id: &str, date: &str, time: &str) -> Meeting {
        Meeting {
            id: id.to_string(),
            client_id: client_id.to_string(),
            client_name: "ACME".to_string(),
            contact_name: Some("Joana".to_string()),
            date: date.to_string(),
            time: time.to_string(),
            meeting_type: "online".to_string(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn meeting_confirmation_resolves_client_and_defaults_type() {
        let store = MemoryStore::new();
        let ctx = context_with_acme();
        let tc = call(
            "agendar_reuniao",
            json!({ "clientId": "c1", "date": "2025-01-10", "time": "14:00" }),
        );
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::Meeting), &ctx, "u1").await;

        assert_eq!(confirmation.confirmation_type, ConfirmationType::Meeting);
        assert_eq!(confirmation.status, "pending");
        match confirmation.data {
            ConfirmationPayload::Meeting {
                client_name,
                meeting_type,
                date,
                ..
            } => {
                assert_eq!(client_name, "ACME");
                assert_eq!(meeting_type, "online");
                assert_eq!(date, "2025-01-10");
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unresolved_client_falls_back_without_failing() {
        let store = MemoryStore::new();
        let ctx = UserContext::default();
        let tc = call(
            "enviar_whatsapp",
            json!({ "clientId": "ghost", "message": "oi" }),
        );
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::Whatsapp), &ctx, "u1").await;

        match confirmation.data {
            ConfirmationPayload::Whatsapp {
                client_name,
                contact_name,
                phone,
                ..
            } => {
                assert_eq!(client_name, "Cliente");
                assert_eq!(contact_name, "Cliente");
                assert_eq!(phone, "");
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolved_meeting_wins_over_raw_parameters() {
        let store = MemoryStore::new();
        store.insert_meeting("u1", meeting("m1", "c9", "2025-02-01", "09:30"));
        let ctx = context_with_acme();
        // Parameters disagree with the stored meeting on every field.
        let tc = call(
            "cancelar_reuniao",
            json!({ "meetingId": "m1", "clientId": "c1", "date": "2099-12-31", "time": "23:00" }),
        );
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::MeetingDelete), &ctx, "u1")
                .await;

        match confirmation.data {
            ConfirmationPayload::MeetingDelete {
                meeting_id,
                client_id,
                date,
                time,
                ..
            } => {
                assert_eq!(meeting_id, "m1");
                assert_eq!(client_id, "c9");
                assert_eq!(date, "2025-02-01");
                assert_eq!(time, "09:30");
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_date_pair_resolves_most_recent_meeting() {
        let store = MemoryStore::new();
        let mut older = meeting("m-old", "c1", "2025-01-10", "10:00");
        older.created_at = Utc::now() - chrono::Duration::hours(2);
        store.insert_meeting("u1", older);
        store.insert_meeting("u1", meeting("m-new", "c1", "2025-01-10", "15:00"));

        let ctx = context_with_acme();
        let tc = call(
            "reagendar_reuniao",
            json!({ "clientId": "c1", "date": "2025-01-10", "newTime": "16:00" }),
        );
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::MeetingUpdate), &ctx, "u1")
                .await;

        match confirmation.data {
            ConfirmationPayload::MeetingUpdate {
                meeting_id,
                new_time,
                new_date,
                ..
            } => {
                assert_eq!(meeting_id, "m-new");
                assert_eq!(new_time.as_deref(), Some("16:00"));
                assert_eq!(new_date, None);
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_meeting_reference_leaves_empty_fields() {
        let store = MemoryStore::new();
        let ctx = UserContext::default();
        let tc = call("cancelar_reuniao", json!({}));
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::MeetingDelete), &ctx, "u1")
                .await;

        match confirmation.data {
            ConfirmationPayload::MeetingDelete {
                meeting_id,
                date,
                time,
                client_name,
                ..
            } => {
                assert_eq!(meeting_id, "");
                assert_eq!(date, "");
                assert_eq!(time, "");
                assert_eq!(client_name, "Cliente");
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn task_confirmation_defaults_priority_to_medium() {
        let store = MemoryStore::new();
        let ctx = context_with_acme();
        let tc = call(
            "criar_tarefa",
            json!({ "clientId": "c1", "title": "Enviar proposta" }),
        );
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::Task), &ctx, "u1").await;

        assert_eq!(confirmation.confirmation_type, ConfirmationType::Task);
        assert_eq!(confirmation.status, "pending");
        match confirmation.data {
            ConfirmationPayload::Task {
                title,
                priority,
                client_name,
                due_date,
                ..
            } => {
                assert_eq!(title, "Enviar proposta");
                assert_eq!(priority, "medium");
                assert_eq!(client_name.as_deref(), Some("ACME"));
                assert_eq!(due_date, None);
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reminder_confirmation_keeps_optional_fields_absent() {
        let store = MemoryStore::new();
        let ctx = UserContext::default();
        let tc = call(
            "criar_lembrete",
            json!({ "message": "Ligar para a ACME", "date": "2025-03-01" }),
        );
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::Reminder), &ctx, "u1").await;

        assert_eq!(confirmation.confirmation_type, ConfirmationType::Reminder);
        assert_eq!(confirmation.status, "pending");
        match confirmation.data {
            ConfirmationPayload::Reminder {
                message,
                date,
                time,
                client_id,
                client_name,
            } => {
                assert_eq!(message, "Ligar para a ACME");
                assert_eq!(date, "2025-03-01");
                assert_eq!(time, None);
                assert_eq!(client_id, None);
                assert_eq!(client_name, None);
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_select_starts_with_empty_candidates() {
        let store = MemoryStore::new();
        let ctx = UserContext::default();
        let tc = call("selecionar_cliente", json!({ "query": "ac" }));
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::ClientSelect), &ctx, "u1")
                .await;

        assert_eq!(confirmation.confirmation_type, ConfirmationType::ClientSelect);
        assert_eq!(confirmation.status, "pending");
        match confirmation.data {
            ConfirmationPayload::ClientSelect {
                query,
                candidates,
                original_request,
                pending_tool,
            } => {
                assert_eq!(query, "ac");
                assert!(candidates.is_empty());
                assert_eq!(original_request, "");
                assert_eq!(pending_tool.name, "selecionar_cliente");
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_type_produces_generic_with_raw_params() {
        let store = MemoryStore::new();
        let ctx = UserContext::default();
        let params = json!({ "foo": "bar", "n": 3 });
        let tc = call("ferramenta_nova", params.clone());
        let confirmation = build_confirmation(&store, &tc, None, &ctx, "u1").await;

        assert_eq!(confirmation.confirmation_type, ConfirmationType::Generic);
        match confirmation.data {
            ConfirmationPayload::Generic { title, details, .. } => {
                assert_eq!(title, "Confirmar: ferramenta_nova");
                assert_eq!(details, params);
            }
            other => panic!("wrong payload variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn envelope_serializes_with_camel_case_contract() {
        let store = MemoryStore::new();
        let ctx = context_with_acme();
        let tc = call(
            "registrar_pagamento",
            json!({ "clientId": "c1", "amount": "1500,50", "dueDate": "2025-02-01" }),
        );
        let confirmation =
            build_confirmation(&store, &tc, Some(ConfirmationType::Payment), &ctx, "u1").await;
        let json = serde_json::to_value(&confirmation).expect("serialize");

        assert_eq!(json["type"], "payment");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["data"]["clientName"], "ACME");
        assert_eq!(json["data"]["amount"], 1500.5);
        assert!(json["toolToExecute"]["name"].is_string());
        assert!(json["createdAt"].is_string());
    }
}
