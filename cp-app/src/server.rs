//! Copiloto HTTP server: wires config, storage, the model chain and the
//! chat routes together.

use crate::assistant::{AssistantAgent, ModelCapability};
use crate::config::CopilotoConfig;
use crate::http_auth;
use crate::routes;
use crate::format::ResultFormatter;
use crate::suggest::SuggestionEngine;
use anyhow::Result;
use axum::Extension;
use axum::http::HeaderMap;
use axum::http::Request;
use axum::http::StatusCode;
use axum::response::Response;
use cp_llm::{LlmClient, LlmRouter};
use cp_tools::{SqliteStore, Store, ToolExecutor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub executor: ToolExecutor,
    pub model: Arc<dyn ModelCapability>,
    pub suggestions: SuggestionEngine,
    pub formatter: ResultFormatter,
}

pub async fn doctor(config_path: Option<PathBuf>) -> Result<()> {
    let (cfg, path) = CopilotoConfig::load_with_path(config_path).await?;
    let chain = cfg.model_chain();
    let usable: Vec<&String> = chain
        .iter()
        .filter(|m| cfg.api_key_for_model(m).is_some())
        .collect();
    tracing::info!(
        model = %cfg.general.model,
        model_chain_len = chain.len(),
        models_with_keys = usable.len(),
        bind_addr = %cfg.bind_addr()?,
        db_path = %cfg.db_path().display(),
        auth_tokens = cfg.auth.tokens.len(),
        anonymous_user = cfg.auth.anonymous_user_id.is_some(),
        config_path = %path.display(),
        "config ok"
    );
    if usable.is_empty() {
        tracing::warn!("no API key matches any configured model; chat requests will return 503");
    }
    Ok(())
}

pub async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let (cfg, cfg_path) = CopilotoConfig::load_with_path(config_path).await?;
    let addr = cfg.bind_addr()?;
    tracing::info!(
        bind_addr = %addr,
        model = %cfg.general.model,
        fallback_models = cfg.general.fallback_models.len(),
        db_path = %cfg.db_path().display(),
        http_timeout_seconds = cfg.runtime.http_timeout_seconds,
        http_max_in_flight = cfg.runtime.http_max_in_flight,
        auth_tokens = cfg.auth.tokens.len(),
        config_path = %cfg_path.display(),
        "server configuration loaded"
    );
    let listener = preflight_bind_listener(addr).await?;

    let db_path = cfg.db_path();
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path)?);

    let llm_clients = build_llm_clients(&cfg);
    if llm_clients.is_empty() {
        tracing::warn!(
            "no llm clients could be built; chat requests will be rejected with 503"
        );
    } else {
        tracing::info!(chain_len = llm_clients.len(), "llm chain initialized");
    }
    let router = LlmRouter::new(llm_clients);
    let assistant = AssistantAgent::new(router, cfg.general.system_prompt.clone());

    let state = Arc::new(AppState {
        store: store.clone(),
        executor: ToolExecutor::new(store),
        model: Arc::new(assistant),
        suggestions: SuggestionEngine::new(),
        formatter: ResultFormatter::new(),
    });

    let auth_policy = http_auth::AuthPolicy::from_config(&cfg);
    let api_router = routes::router()
        .layer(axum::middleware::from_fn(http_auth::require_user))
        .layer(Extension(http_auth::AuthPolicyExt(auth_policy)))
        .layer(Extension(state));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id_from_headers(request.headers())
            )
        })
        .on_response(
            |response: &Response, latency: Duration, _span: &tracing::Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis() as u64,
                    "http request completed"
                );
            },
        )
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                tracing::error!(
                    error_class = %error,
                    latency_ms = latency.as_millis() as u64,
                    "http request failed"
                );
            },
        );

    let app = api_router
        .layer(GlobalConcurrencyLimitLayer::new(
            cfg.runtime.http_max_in_flight,
        ))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(cfg.runtime.http_timeout_seconds),
        ))
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let shutdown = CancellationToken::new();
    tracing::info!(%addr, "copiloto serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;
    tracing::info!("http server shutdown completed");
    shutdown.cancel();
    Ok(())
}

async fn preflight_bind_listener(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    tracing::info!(%addr, "preflight bind check starting");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("preflight bind failed for {addr}: {e}"))?;
    tracing::info!(%addr, "preflight bind check passed");
    Ok(listener)
}

/// One client per model in the chain that has a matching API key. Models
/// without keys are skipped, not fatal: the chat route answers 503 when the
/// chain ends up empty.
fn build_llm_clients(cfg: &CopilotoConfig) -> Vec<LlmClient> {
    let mut clients = Vec::new();
    for model in cfg.model_chain() {
        let Some(api_key) = cfg.api_key_for_model(&model) else {
            tracing::warn!(model = %model, "no API key for model; skipping in chain");
            continue;
        };
        clients.push(LlmClient::new(&api_key, &model));
    }
    clients
}

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "missing".to_string())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler; falling back to ctrl_c only");
                if let Err(ctrlc_err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %ctrlc_err, "failed to await ctrl-c signal");
                }
                shutdown.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received ctrl-c; beginning graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::warn!("received SIGTERM; beginning graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to await ctrl-c signal");
        } else {
            tracing::warn!("received ctrl-c; beginning graceful shutdown");
        }
    }
    shutdown.cancel();
}
