//! Configuration types and loading.
//!
//! Config is loaded once at startup from a JSON file (e.g. `~/.watson-relay/config.json`)
//! and environment, then shared read-only for the life of the process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion service settings (credential, endpoint, model).
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Published API metadata (health message, OpenAPI info and servers).
    #[serde(default)]
    pub api: ApiConfig,
}

/// Bind address and port for the webhook server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port (default 8080). Overridden by PORT env.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_port() -> u16 {
    8080
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

/// OpenAI-compatible completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// API key. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,

    /// Base URL of the chat-completions API (default "https://api.openai.com/v1").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on one completion call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// API metadata. Not behavior: only surfaced through the health message and `/openapi.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Name used in the health message ("<serviceName> server is running").
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Server entries for the OpenAPI document.
    #[serde(default = "default_servers")]
    pub servers: Vec<ApiServer>,
}

/// One OpenAPI server entry; `url` may contain `{variable}` templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiServer {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub variables: Vec<ApiServerVariable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiServerVariable {
    pub name: String,
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_title() -> String {
    "FNB API for Watson Assistant".to_string()
}

fn default_version() -> String {
    "1.0.1".to_string()
}

fn default_service_name() -> String {
    "FNB API".to_string()
}

fn default_servers() -> Vec<ApiServer> {
    let var = |name: &str, default: &str, description: &str| ApiServerVariable {
        name: name.to_string(),
        default: default.to_string(),
        description: Some(description.to_string()),
    };
    vec![ApiServer {
        url: "https://{appname}.{projectid}.{region}.codeengine.appdomain.cloud".to_string(),
        description: Some("Code Engine deployment".to_string()),
        variables: vec![
            var("appname", "fnb-bot-backend", "application name"),
            var("projectid", "projectid", "the Code Engine project ID"),
            var("region", "us-south", "the deployment region"),
        ],
    }]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_version(),
            service_name: default_service_name(),
            servers: default_servers(),
        }
    }
}

/// Environment value if set and non-blank, else the configured value if non-blank.
fn env_or_configured(env_value: Option<String>, configured: Option<&str>) -> Option<String> {
    env_value
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the completion API key: env OPENAI_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    env_or_configured(
        std::env::var("OPENAI_API_KEY").ok(),
        config.completion.api_key.as_deref(),
    )
}

/// Resolve the listening port: env PORT overrides config. An unparsable PORT is ignored with a warning.
pub fn resolve_port(config: &Config) -> u16 {
    port_from_env(std::env::var("PORT").ok(), config.server.port)
}

fn port_from_env(env_value: Option<String>, configured: u16) -> u16 {
    match env_value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                log::warn!("ignoring invalid PORT value {:?}, using {}", raw, configured);
                configured
            }
        },
        None => configured,
    }
}

/// Fold env overrides (OPENAI_API_KEY, PORT) into the loaded config. Called once at startup.
pub fn apply_env_overrides(config: &mut Config) {
    config.completion.api_key = resolve_api_key(config);
    config.server.port = resolve_port(config);
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".watson-relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_port_and_bind() {
        let s = ServerConfig::default();
        assert_eq!(s.port, 8080);
        assert_eq!(s.bind, "0.0.0.0");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"completion": {"model": "gpt-4o-mini", "timeoutSecs": 5}}"#)
                .unwrap();
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.completion.timeout_secs, 5);
        assert_eq!(config.completion.base_url, "https://api.openai.com/v1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.api.service_name, "FNB API");
        assert_eq!(config.api.servers.len(), 1);
    }

    #[test]
    fn env_value_wins_over_configured() {
        assert_eq!(
            env_or_configured(Some(" sk-env ".to_string()), Some("sk-file")),
            Some("sk-env".to_string())
        );
        assert_eq!(
            env_or_configured(Some("  ".to_string()), Some("sk-file")),
            Some("sk-file".to_string())
        );
        assert_eq!(env_or_configured(None, Some("")), None);
    }

    #[test]
    fn port_env_parsing() {
        assert_eq!(port_from_env(Some("9000".to_string()), 8080), 9000);
        assert_eq!(port_from_env(Some("not-a-port".to_string()), 8080), 8080);
        assert_eq!(port_from_env(None, 8081), 8081);
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let path = std::env::temp_dir()
            .join(format!("relay-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.completion.model, "gpt-3.5-turbo");
    }
}
