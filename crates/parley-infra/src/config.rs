//! Configuration loading for Parley.
//!
//! Two sources feed the process:
//! - an optional `config.toml` deserialized into [`ProxyConfig`]; a missing
//!   file means defaults, an unreadable or invalid one is fatal;
//! - environment variables selecting the update transport (`PORT`,
//!   `RAILWAY_PUBLIC_DOMAIN` / `PARLEY_PUBLIC_DOMAIN`).

use std::path::{Path, PathBuf};

use parley_types::config::ProxyConfig;
use parley_types::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "PARLEY_CONFIG";

/// Listen port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Public hostname variables, checked in order.
pub const PUBLIC_DOMAIN_VARS: [&str; 2] = ["RAILWAY_PUBLIC_DOMAIN", "PARLEY_PUBLIC_DOMAIN"];

/// Pick the config file: explicit path, then `$PARLEY_CONFIG`, then
/// `{config_dir}/parley/config.toml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("parley").join("config.toml"))
}

/// Load and validate the proxy configuration at `path`.
///
/// - Missing file: [`ProxyConfig::default()`].
/// - Unreadable file: [`ConfigError::Unreadable`].
/// - Bad TOML or out-of-range values: [`ConfigError::Invalid`] /
///   [`ConfigError::InvalidValue`].
pub async fn load_proxy_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(ProxyConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    let config: ProxyConfig = toml::from_str(&content).map_err(|err| ConfigError::Invalid {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;

    validate(&config)?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn validate(config: &ProxyConfig) -> Result<(), ConfigError> {
    let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    if config.history.max_rounds == 0 {
        return Err(invalid("history.max_rounds", "must be at least 1"));
    }
    if config.model.name.trim().is_empty() {
        return Err(invalid("model.name", "must not be empty"));
    }
    if config.model.timeout_secs == 0 {
        return Err(invalid("model.timeout_secs", "must be at least 1"));
    }
    if config.model.max_input_tokens == 0 {
        return Err(invalid("model.max_input_tokens", "must be at least 1"));
    }
    if let Some(t) = config.model.temperature
        && !(0.0..=2.0).contains(&t)
    {
        return Err(invalid("model.temperature", "must be between 0.0 and 2.0"));
    }
    let path = config.webhook.path.trim_matches('/');
    if path.is_empty() || path.contains('/') {
        return Err(invalid("webhook.path", "must be a single non-empty path segment"));
    }
    Ok(())
}

/// How Telegram updates reach the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Telegram pushes updates to `https://{domain}/{path}`; we listen on `port`.
    Webhook { domain: String, port: u16 },
    /// We long-poll `getUpdates`.
    Polling,
}

/// Command-line overrides for the transport settings.
#[derive(Debug, Clone, Default)]
pub struct TransportOverrides {
    pub port: Option<u16>,
    pub domain: Option<String>,
    pub force_polling: bool,
}

/// Resolve the transport from the real environment.
pub fn resolve_transport(overrides: &TransportOverrides) -> Result<Transport, ConfigError> {
    resolve_transport_with(|key| std::env::var(key).ok(), overrides)
}

/// Resolve the transport from an arbitrary environment lookup.
pub fn resolve_transport_with(
    lookup: impl Fn(&str) -> Option<String>,
    overrides: &TransportOverrides,
) -> Result<Transport, ConfigError> {
    if overrides.force_polling {
        return Ok(Transport::Polling);
    }

    let domain = overrides.domain.clone().or_else(|| {
        PUBLIC_DOMAIN_VARS
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()))
    });
    let Some(domain) = domain else {
        return Ok(Transport::Polling);
    };

    let port = match overrides.port {
        Some(port) => port,
        None => match lookup("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                reason: format!("'{raw}' is not a valid port number"),
            })?,
            None => DEFAULT_PORT,
        },
    };

    Ok(Transport::Webhook {
        domain: normalize_domain(&domain),
        port,
    })
}

/// Strip a scheme and trailing slashes so `https://{domain}/...` is well formed.
fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

/// Public URL Telegram should post updates to.
pub fn webhook_url(domain: &str, path: &str) -> String {
    format!("https://{}/{}", domain, path.trim_matches('/'))
}
