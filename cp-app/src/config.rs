//! Copiloto configuration loader.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct CopilotoConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub model: String,
    /// Tried in order after `model` when a provider call fails.
    #[serde(default)]
    pub fallback_models: Vec<String>,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_system_prompt() -> String {
    "Você é o Copiloto, o assistente da agência. Responda em português, de forma \
     curta e direta. Use as ferramentas disponíveis para consultar dados ou propor \
     ações; nunca invente informações sobre clientes, reuniões ou pagamentos."
        .to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// SQLite database path. Default: `~/.copiloto/copiloto.db`.
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_http_max_in_flight")]
    pub http_max_in_flight: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    30
}

fn default_http_max_in_flight() -> usize {
    64
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: None,
            http_timeout_seconds: default_http_timeout_seconds(),
            http_max_in_flight: default_http_max_in_flight(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<ApiTokenConfig>,
    /// When set, requests without a bearer token act as this user. Local
    /// development only.
    #[serde(default)]
    pub anonymous_user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTokenConfig {
    pub token: String,
    pub user_id: String,
}

impl CopilotoConfig {
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let (cfg, _path) = Self::load_with_path(path).await?;
        Ok(cfg)
    }

    pub async fn load_with_path(path: Option<PathBuf>) -> anyhow::Result<(Self, PathBuf)> {
        let path = path.unwrap_or_else(default_config_path);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;

        let mut cfg: CopilotoConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok((cfg, path))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("COPILOTO_MODEL") {
            if !v.trim().is_empty() {
                self.general.model = v;
            }
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            if !v.trim().is_empty() {
                self.keys.openai_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("ANTHROPIC_API_KEY") {
            if !v.trim().is_empty() {
                self.keys.anthropic_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("COPILOTO_BIND") {
            if !v.trim().is_empty() {
                self.runtime.bind_addr = v;
            }
        }
        if let Ok(v) = std::env::var("COPILOTO_DB") {
            if !v.trim().is_empty() {
                self.runtime.db_path = Some(v);
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.general.model.trim().is_empty() {
            return Err(anyhow::anyhow!("general.model is required"));
        }
        self.bind_addr()?;
        if self.auth.tokens.is_empty() && self.auth.anonymous_user_id.is_none() {
            return Err(anyhow::anyhow!(
                "auth.tokens is empty and auth.anonymous_user_id is unset; no caller could ever authenticate"
            ));
        }
        for t in &self.auth.tokens {
            if t.token.trim().is_empty() || t.user_id.trim().is_empty() {
                return Err(anyhow::anyhow!("auth.tokens entries need token and user_id"));
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.runtime
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("runtime.bind_addr {:?}: {e}", self.runtime.bind_addr))
    }

    pub fn db_path(&self) -> PathBuf {
        match &self.runtime.db_path {
            Some(p) => PathBuf::from(p),
            None => default_data_dir().join("copiloto.db"),
        }
    }

    /// Models tried in order, primary first.
    pub fn model_chain(&self) -> Vec<String> {
        let mut chain = Vec::with_capacity(1 + self.general.fallback_models.len());
        chain.push(self.general.model.clone());
        for m in &self.general.fallback_models {
            if !chain.contains(m) {
                chain.push(m.clone());
            }
        }
        chain
    }

    pub fn api_key_for_model(&self, model: &str) -> Option<String> {
        let m = model.to_ascii_lowercase();
        if m.starts_with("claude-") {
            return self.keys.anthropic_api_key.clone().filter(|s| !s.is_empty());
        }
        self.keys.openai_api_key.clone().filter(|s| !s.is_empty())
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".copiloto").join("config.toml")
}

pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".copiloto")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> CopilotoConfig {
        toml::from_str(
            r#"
[general]
model = "gpt-4o-mini"
fallback_models = ["claude-3-5-haiku", "gpt-4o-mini"]

[auth]
anonymous_user_id = "local"
"#,
        )
        .expect("parse config")
    }

    #[test]
    fn model_chain_deduplicates_and_keeps_order() {
        let cfg = base_config();
        assert_eq!(cfg.model_chain(), vec!["gpt-4o-mini", "claude-3-5-haiku"]);
    }

    #[test]
    fn api_keys_follow_provider_prefix() {
        let mut cfg = base_config();
        cfg.keys.openai_api_key = Some("sk-openai".to_string());
        cfg.keys.anthropic_api_key = Some("sk-ant".to_string());
        assert_eq!(cfg.api_key_for_model("gpt-4o-mini").as_deref(), Some("sk-openai"));
        assert_eq!(
            cfg.api_key_for_model("claude-3-5-haiku").as_deref(),
            Some("sk-ant")
        );
    }

    #[test]
    fn validate_rejects_unauthenticatable_config() {
        let mut cfg = base_config();
        cfg.auth.anonymous_user_id = None;
        assert!(cfg.validate().is_err());
    }
}
