//! Per-request user context snapshot, built once from storage and passed
//! read-only into the model call and the confirmation builder.

use crate::suggest::{SuggestedAction, navigate};
use cp_tools::{Client, Meeting, Payment, Result, Store, Task};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub clients: Vec<Client>,
    pub pending_tasks: Vec<Task>,
    pub pending_payments: Vec<Payment>,
    pub upcoming_meetings: Vec<Meeting>,
}

#[tracing::instrument(level = "debug", skip_all, fields(user_id = %user_id))]
pub async fn build_user_context(store: &dyn Store, user_id: &str) -> Result<UserContext> {
    let ctx = UserContext {
        clients: store.clients(user_id).await?,
        pending_tasks: store.pending_tasks(user_id).await?,
        pending_payments: store.pending_payments(user_id).await?,
        upcoming_meetings: store.upcoming_meetings(user_id).await?,
    };
    tracing::debug!(
        clients = ctx.clients.len(),
        pending_tasks = ctx.pending_tasks.len(),
        pending_payments = ctx.pending_payments.len(),
        upcoming_meetings = ctx.upcoming_meetings.len(),
        "user context loaded"
    );
    Ok(ctx)
}

/// Suggestions for answers without any tool call, derived from pending-work
/// counts. Fixed priority: tasks, then payments, then meetings; capped at 3.
pub fn context_suggestions(ctx: &UserContext) -> Vec<SuggestedAction> {
    let mut out = Vec::new();
    if !ctx.pending_tasks.is_empty() {
        out.push(navigate(
            format!("{} tarefa(s) pendente(s)", ctx.pending_tasks.len()),
            "check-circle",
            "/tarefas",
        ));
    }
    if !ctx.pending_payments.is_empty() {
        out.push(navigate(
            format!("{} pagamento(s) pendente(s)", ctx.pending_payments.len()),
            "dollar-sign",
            "/financeiro",
        ));
    }
    if !ctx.upcoming_meetings.is_empty() {
        out.push(navigate(
            format!("{} reunião(ões) agendada(s)", ctx.upcoming_meetings.len()),
            "calendar",
            "/calendario",
        ));
    }
    out.truncate(3);
    out
}
