//! Read-only query tools. Each returns the raw `data` payload the formatter
//! and suggestion generator consume; "nothing found" is an empty list or a
//! narrative sentence, never an error.

use crate::error::Result;
use crate::store::Store;
use chrono::Utc;
use serde_json::{Value, json};

pub(crate) async fn listar_clientes(store: &dyn Store, user_id: &str) -> Result<Value> {
    let clients = store.clients(user_id).await?;
    let total = clients.len();
    Ok(json!({ "clients": clients, "total": total }))
}

pub(crate) async fn buscar_cliente(store: &dyn Store, user_id: &str, args: &Value) -> Result<Value> {
    let query = opt_str(args, "nome")
        .or_else(|| opt_str(args, "query"))
        .unwrap_or_default();
    let clients = if query.is_empty() {
        vec![]
    } else {
        store.search_clients(user_id, &query).await?
    };
    Ok(json!({ "clients": clients, "query": query }))
}

pub(crate) async fn listar_reunioes(store: &dyn Store, user_id: &str) -> Result<Value> {
    let meetings = store.upcoming_meetings(user_id).await?;
    let total = meetings.len();
    Ok(json!({ "meetings": meetings, "total": total }))
}

pub(crate) async fn listar_tarefas(store: &dyn Store, user_id: &str) -> Result<Value> {
    let tasks = store.pending_tasks(user_id).await?;
    let total = tasks.len();
    Ok(json!({ "tasks": tasks, "total": total }))
}

pub(crate) async fn listar_pagamentos(store: &dyn Store, user_id: &str) -> Result<Value> {
    let payments = store.pending_payments(user_id).await?;
    let total = payments.len();
    Ok(json!({ "payments": payments, "total": total }))
}

pub(crate) async fn resumo_dia(store: &dyn Store, user_id: &str) -> Result<Value> {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let meetings = store.upcoming_meetings(user_id).await?;
    let today_meetings: Vec<_> = meetings.iter().filter(|m| m.date == today).collect();
    let tasks = store.pending_tasks(user_id).await?;
    let payments = store.pending_payments(user_id).await?;
    let overdue = payments.iter().filter(|p| p.days_overdue > 0).count();

    let mut resumo = format!("📋 Resumo de hoje ({today}):\n");
    if today_meetings.is_empty() {
        resumo.push_str("Nenhuma reunião hoje.\n");
    } else {
        resumo.push_str(&format!("📅 {} reunião(ões):\n", today_meetings.len()));
        for m in &today_meetings {
            resumo.push_str(&format!("• {} — {} ({})\n", m.time, m.client_name, m.meeting_type));
        }
    }
    resumo.push_str(&format!("✅ {} tarefa(s) pendente(s)\n", tasks.len()));
    resumo.push_str(&format!("💰 {} pagamento(s) pendente(s)", payments.len()));
    if overdue > 0 {
        resumo.push_str(&format!(", {overdue} em atraso ⚠️"));
    }

    Ok(json!({ "resumo": resumo }))
}

pub(crate) async fn resumo_cliente(store: &dyn Store, user_id: &str, args: &Value) -> Result<Value> {
    let client = match opt_str(args, "clientId") {
        Some(id) => store
            .clients(user_id)
            .await?
            .into_iter()
            .find(|c| c.id == id),
        None => match opt_str(args, "nome") {
            Some(nome) => store.search_clients(user_id, &nome).await?.into_iter().next(),
            None => None,
        },
    };

    let Some(client) = client else {
        return Ok(json!({ "resumo": "Não encontrei esse cliente." }));
    };

    let meetings = store.upcoming_meetings(user_id).await?;
    let client_meetings = meetings.iter().filter(|m| m.client_id == client.id).count();
    let payments = store.pending_payments(user_id).await?;
    let client_payments: Vec<_> = payments.iter().filter(|p| p.client_id == client.id).collect();
    let pending_total: f64 = client_payments.iter().map(|p| p.amount).sum();

    let mut resumo = format!("📌 {}\n", client.name);
    if let Some(segment) = &client.segment {
        resumo.push_str(&format!("Segmento: {segment}\n"));
    }
    resumo.push_str(&format!("Próximas reuniões: {client_meetings}\n"));
    if client_payments.is_empty() {
        resumo.push_str("Pagamentos em dia ✅");
    } else {
        resumo.push_str(&format!(
            "Pagamentos pendentes: {} ({})",
            client_payments.len(),
            format_amount(pending_total)
        ));
    }

    Ok(json!({ "resumo": resumo, "clientId": client.id, "clientName": client.name }))
}

pub(crate) async fn analisar_performance(store: &dyn Store, user_id: &str) -> Result<Value> {
    let clients = store.clients(user_id).await?;
    let meetings = store.upcoming_meetings(user_id).await?;
    let payments = store.pending_payments(user_id).await?;
    let overdue: Vec<_> = payments.iter().filter(|p| p.days_overdue > 0).collect();
    let overdue_total: f64 = overdue.iter().map(|p| p.amount).sum();

    let mut analise = format!(
        "📊 Carteira: {} cliente(s), {} reunião(ões) agendada(s).\n",
        clients.len(),
        meetings.len()
    );
    if overdue.is_empty() {
        analise.push_str("Nenhum pagamento em atraso. Tudo em dia! ✅");
    } else {
        analise.push_str(&format!(
            "⚠️ {} pagamento(s) em atraso, total de {}.",
            overdue.len(),
            format_amount(overdue_total)
        ));
    }

    Ok(json!({ "analise": analise }))
}

pub(crate) async fn gerar_mensagem(store: &dyn Store, user_id: &str, args: &Value) -> Result<Value> {
    let client_id = opt_str(args, "clientId").unwrap_or_default();
    let client = store
        .clients(user_id)
        .await?
        .into_iter()
        .find(|c| c.id == client_id);

    let (client_id, client_name, greeting_name) = match &client {
        Some(c) => (
            c.id.clone(),
            c.name.clone(),
            c.contact_name.clone().unwrap_or_else(|| c.name.clone()),
        ),
        None => (client_id, "Cliente".to_string(), "Cliente".to_string()),
    };

    let objetivo = opt_str(args, "objetivo").unwrap_or_default();
    let mensagem = if objetivo.is_empty() {
        format!("Olá, {greeting_name}! Tudo bem? Podemos conversar sobre os próximos passos?")
    } else {
        format!("Olá, {greeting_name}! Tudo bem? Gostaria de falar sobre: {objetivo}.")
    };

    Ok(json!({
        "mensagem": mensagem,
        "clientId": client_id,
        "clientName": client_name,
    }))
}

pub(crate) fn format_amount(amount: f64) -> String {
    format!("R$ {amount:.2}").replace('.', ",")
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
