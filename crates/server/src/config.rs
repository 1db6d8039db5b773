use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tessera_core::tenant::TenantCredentials;
use tessera_sdk::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub tenant: TenantDefaults,

    /// Retry policy for upstream calls made by every tenant's tools.
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Values applied to every tenant that does not supply its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantDefaults {
    pub environment_id: Option<String>,
    pub host: Option<String>,
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read configuration file")?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Credentials for one caller, with the configured defaults filled in.
    pub fn credentials(
        &self,
        access_token: String,
        space_id: String,
        environment_id: Option<String>,
    ) -> TenantCredentials {
        let mut credentials = TenantCredentials::new(access_token, space_id);
        if let Some(host) = &self.tenant.host {
            credentials = credentials.with_host(host.clone());
        }
        if let Some(environment_id) = environment_id.or_else(|| self.tenant.environment_id.clone()) {
            credentials = credentials.with_environment(environment_id);
        }
        credentials
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: ServerConfig = toml::from_str(
            r#"
            [cors]
            allowed_origins = ["https://app.example.com"]

            [tenant]
            host = "api.eu.contentful.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.cors.allowed_origins, ["https://app.example.com"]);
        assert_eq!(config.tenant.host.as_deref(), Some("api.eu.contentful.com"));
        assert!(config.tenant.environment_id.is_none());
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_parse_retry_section() {
        let config: ServerConfig = toml::from_str(
            r#"
            [retry]
            max_attempts = 2
            base_delay_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 50);
        assert_eq!(config.retry.max_delay_ms, RetryPolicy::default().max_delay_ms);
    }

    #[test]
    fn test_credentials_apply_defaults() {
        let config = ServerConfig {
            tenant: TenantDefaults {
                environment_id: Some("staging".into()),
                host: Some("api.eu.contentful.com".into()),
            },
            ..Default::default()
        };

        let credentials = config.credentials("cfpat-0123456789".into(), "s1".into(), None);
        assert_eq!(credentials.environment_id, "staging");
        assert_eq!(credentials.host, "api.eu.contentful.com");

        let credentials =
            config.credentials("cfpat-0123456789".into(), "s1".into(), Some("master".into()));
        assert_eq!(credentials.environment_id, "master");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load(Path::new("/nonexistent/tessera.toml")).unwrap();
        assert!(config.cors.allowed_origins.is_empty());
    }
}
