//! Bearer-token authentication for the chat surface. Every request resolves
//! to a user id, which scopes all storage reads downstream.

use crate::config::CopilotoConfig;
use axum::Json;
use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// The authenticated user id, attached as a request extension.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub String);

#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    tokens: Vec<(String, String)>,
    anonymous_user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthPolicyExt(pub AuthPolicy);

impl AuthPolicy {
    /// `tokens` maps bearer token to user id.
    pub fn new(tokens: Vec<(String, String)>, anonymous_user_id: Option<String>) -> Self {
        Self {
            tokens,
            anonymous_user_id,
        }
    }

    pub fn from_config(cfg: &CopilotoConfig) -> Self {
        let tokens = cfg
            .auth
            .tokens
            .iter()
            .filter(|t| !t.token.trim().is_empty() && !t.user_id.trim().is_empty())
            .map(|t| (t.token.trim().to_string(), t.user_id.trim().to_string()))
            .collect();
        Self {
            tokens,
            anonymous_user_id: cfg
                .auth
                .anonymous_user_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        if let Some(provided) = parse_bearer_token(headers) {
            return self
                .tokens
                .iter()
                .find(|(token, _)| *token == provided)
                .map(|(_, user_id)| user_id.clone());
        }
        self.anonymous_user_id.clone()
    }
}

fn parse_bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = raw.trim().splitn(2, char::is_whitespace);
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = parts.next()?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Não autorizado" })),
    )
        .into_response()
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn require_user(mut req: Request<Body>, next: Next) -> Response {
    let policy = req
        .extensions()
        .get::<AuthPolicyExt>()
        .map(|v| v.0.clone())
        .unwrap_or_default();

    let Some(user_id) = policy.resolve(req.headers()) else {
        tracing::warn!("request rejected: no valid bearer token and no anonymous user configured");
        return unauthorized();
    };

    req.extensions_mut().insert(AuthedUser(user_id));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AuthPolicy {
        AuthPolicy {
            tokens: vec![("secret-a".to_string(), "user-a".to_string())],
            anonymous_user_id: None,
        }
    }

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().expect("header value"));
        headers
    }

    #[test]
    fn known_token_resolves_user() {
        let resolved = policy().resolve(&headers_with_auth("Bearer secret-a"));
        assert_eq!(resolved.as_deref(), Some("user-a"));
    }

    #[test]
    fn unknown_token_is_rejected_even_with_anonymous_fallback() {
        let policy = AuthPolicy {
            anonymous_user_id: Some("anon".to_string()),
            ..policy()
        };
        assert_eq!(policy.resolve(&headers_with_auth("Bearer wrong")), None);
    }

    #[test]
    fn missing_header_falls_back_to_anonymous_user() {
        let policy = AuthPolicy {
            anonymous_user_id: Some("anon".to_string()),
            ..policy()
        };
        assert_eq!(policy.resolve(&HeaderMap::new()).as_deref(), Some("anon"));
    }

    #[test]
    fn missing_header_without_anonymous_user_is_rejected() {
        assert_eq!(policy().resolve(&HeaderMap::new()), None);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let resolved = policy().resolve(&headers_with_auth("bEaReR   secret-a"));
        assert_eq!(resolved.as_deref(), Some("user-a"));
    }
}
