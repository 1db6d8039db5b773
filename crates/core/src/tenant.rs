// Tenant credentials and the immutable per-session tenant context

use crate::redact::{mask_token, SecretRedactor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default environment when the caller does not name one.
pub const DEFAULT_ENVIRONMENT_ID: &str = "master";

/// Default management API host.
pub const DEFAULT_HOST: &str = "api.contentful.com";

const MIN_TOKEN_LEN: usize = 10;

/// Unique identifier for a tenant session (the space it targets)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while building a tenant context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantError {
    #[error("Invalid tenant credentials: {0}")]
    Invalid(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),
}

/// Raw credentials as supplied by a caller (environment, headers, query string).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCredentials {
    #[serde(rename = "CONTENTFUL_MANAGEMENT_ACCESS_TOKEN")]
    pub access_token: String,
    #[serde(rename = "SPACE_ID")]
    pub space_id: String,
    #[serde(rename = "ENVIRONMENT_ID", default = "default_environment_id")]
    pub environment_id: String,
    #[serde(rename = "CONTENTFUL_HOST", default = "default_host")]
    pub host: String,
}

fn default_environment_id() -> String {
    DEFAULT_ENVIRONMENT_ID.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl TenantCredentials {
    pub fn new(access_token: impl Into<String>, space_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            space_id: space_id.into(),
            environment_id: default_environment_id(),
            host: default_host(),
        }
    }

    pub fn with_environment(mut self, environment_id: impl Into<String>) -> Self {
        self.environment_id = environment_id.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Read credentials from the process environment.
    ///
    /// `CONTENTFUL_MANAGEMENT_ACCESS_TOKEN` and `SPACE_ID` are required,
    /// `ENVIRONMENT_ID` and `CONTENTFUL_HOST` fall back to their defaults.
    pub fn from_env() -> Result<Self, TenantError> {
        let access_token = std::env::var("CONTENTFUL_MANAGEMENT_ACCESS_TOKEN")
            .map_err(|_| TenantError::MissingEnv("CONTENTFUL_MANAGEMENT_ACCESS_TOKEN"))?;
        let space_id =
            std::env::var("SPACE_ID").map_err(|_| TenantError::MissingEnv("SPACE_ID"))?;

        let mut credentials = Self::new(access_token, space_id);
        if let Ok(environment_id) = std::env::var("ENVIRONMENT_ID") {
            credentials.environment_id = environment_id;
        }
        if let Ok(host) = std::env::var("CONTENTFUL_HOST") {
            credentials.host = host;
        }
        Ok(credentials)
    }

    /// Validate the credentials, collecting every problem into one message.
    pub fn validate(&self) -> Result<(), TenantError> {
        let mut problems = Vec::new();

        if self.access_token.len() < MIN_TOKEN_LEN {
            problems.push(format!(
                "CONTENTFUL_MANAGEMENT_ACCESS_TOKEN: must be at least {} characters",
                MIN_TOKEN_LEN
            ));
        }
        if self.space_id.trim().is_empty() {
            problems.push("SPACE_ID: is required".to_string());
        }
        if self.environment_id.trim().is_empty() {
            problems.push("ENVIRONMENT_ID: must not be empty".to_string());
        }
        if self.host.trim().is_empty() {
            problems.push("CONTENTFUL_HOST: must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TenantError::Invalid(problems.join("; ")))
        }
    }
}

impl fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("access_token", &mask_token(&self.access_token))
            .field("space_id", &self.space_id)
            .field("environment_id", &self.environment_id)
            .field("host", &self.host)
            .finish()
    }
}

/// The tenant bound to one server instance.
///
/// Built once from validated credentials and never mutated afterwards. Work
/// that runs on behalf of the tenant reads it from the ambient scope (see
/// [`crate::context`]) and logs inside [`TenantContext::span`].
pub struct TenantContext {
    id: TenantId,
    access_token: String,
    space_id: String,
    environment_id: String,
    host: String,
    span: tracing::Span,
    redactor: SecretRedactor,
}

impl TenantContext {
    pub fn new(credentials: TenantCredentials) -> Result<Arc<Self>, TenantError> {
        credentials.validate()?;

        let span = tracing::info_span!(
            "tenant",
            space_id = %credentials.space_id,
            environment_id = %credentials.environment_id,
            host = %credentials.host,
        );
        let redactor = SecretRedactor::new([credentials.access_token.as_str()]);

        Ok(Arc::new(Self {
            id: TenantId::new(credentials.space_id.clone()),
            access_token: credentials.access_token,
            space_id: credentials.space_id,
            environment_id: credentials.environment_id,
            host: credentials.host,
            span,
            redactor,
        }))
    }

    pub fn id(&self) -> &TenantId {
        &self.id
    }

    /// The bearer credential. Never log this directly; use [`Self::redactor`].
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn redactor(&self) -> &SecretRedactor {
        &self.redactor
    }
}

impl fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantContext")
            .field("access_token", &mask_token(&self.access_token))
            .field("space_id", &self.space_id)
            .field("environment_id", &self.environment_id)
            .field("host", &self.host)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_defaults() {
        let creds = TenantCredentials::new("cfpat-0123456789", "space-1");
        assert_eq!(creds.environment_id, "master");
        assert_eq!(creds.host, "api.contentful.com");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_credentials_deserialize_with_defaults() {
        let creds: TenantCredentials = serde_json::from_value(serde_json::json!({
            "CONTENTFUL_MANAGEMENT_ACCESS_TOKEN": "cfpat-0123456789",
            "SPACE_ID": "space-1"
        }))
        .unwrap();

        assert_eq!(creds.environment_id, DEFAULT_ENVIRONMENT_ID);
        assert_eq!(creds.host, DEFAULT_HOST);
    }

    #[test]
    fn test_short_token_rejected() {
        let creds = TenantCredentials::new("short", "space-1");
        let err = creds.validate().unwrap_err();
        assert!(err.to_string().contains("at least 10 characters"));
    }

    #[test]
    fn test_all_problems_reported() {
        let creds = TenantCredentials::new("short", " ").with_environment("");
        let message = creds.validate().unwrap_err().to_string();

        assert!(message.contains("CONTENTFUL_MANAGEMENT_ACCESS_TOKEN"));
        assert!(message.contains("SPACE_ID"));
        assert!(message.contains("ENVIRONMENT_ID"));
    }

    #[test]
    fn test_context_accessors() {
        let creds = TenantCredentials::new("cfpat-0123456789", "space-1")
            .with_environment("staging")
            .with_host("api.eu.contentful.com");
        let ctx = TenantContext::new(creds).unwrap();

        assert_eq!(ctx.id(), &TenantId::new("space-1"));
        assert_eq!(ctx.space_id(), "space-1");
        assert_eq!(ctx.environment_id(), "staging");
        assert_eq!(ctx.host(), "api.eu.contentful.com");
        assert_eq!(ctx.access_token(), "cfpat-0123456789");
    }

    #[test]
    fn test_debug_never_prints_token() {
        let ctx = TenantContext::new(TenantCredentials::new("cfpat-0123456789", "space-1")).unwrap();
        let debug = format!("{:?}", ctx);

        assert!(!debug.contains("cfpat-0123456789"));
        assert!(debug.contains("****6789"));
    }
}
