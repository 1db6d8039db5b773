//! Error types for the Tessera SDK.
//!
//! [`UpstreamError`] is what the wire produced. [`classify`] is the single
//! place where it is turned into a [`ClassifiedError`] with a taxonomy kind
//! and a retry decision; everything above the HTTP layer only sees the
//! classified form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Result type for SDK operations.
pub type TesseraResult<T> = Result<T, ClassifiedError>;

/// A raw failure from the management API or the HTTP stack.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// HTTP request failed before or while reading a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        error_id: Option<String>,
        request_id: Option<String>,
    },

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UpstreamError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            error_id: None,
            request_id: None,
        }
    }

    /// Create an API error from a status code and response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(response) => Self::Api {
                status: response.status.unwrap_or(status),
                message: response
                    .message
                    .or_else(|| response.sys.as_ref().and_then(|s| s.id.clone()))
                    .unwrap_or_else(|| "Unknown error".to_string()),
                error_id: response.sys.and_then(|s| s.id),
                request_id: response.request_id,
            },
            Err(_) => Self::Api {
                status,
                message: if body.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.to_string()
                },
                error_id: None,
                request_id: None,
            },
        }
    }

    /// Status code carried by the failure, directly or nested inside the
    /// transport error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Error body returned by the management API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub sys: Option<ErrorSys>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default, rename = "requestId")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorSys {
    #[serde(default)]
    pub id: Option<String>,
}

/// Taxonomy of upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BadRequest,
    AuthenticationOrPermission,
    NotFound,
    Conflict,
    ValidationFailed,
    RateLimited,
    UpstreamServiceError,
    Unknown,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 | 403 => Self::AuthenticationOrPermission,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::ValidationFailed,
            429 => Self::RateLimited,
            500..=599 => Self::UpstreamServiceError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::UpstreamServiceError)
    }

    fn label(self, status: Option<u16>) -> String {
        match (self, status) {
            (Self::BadRequest, _) => "Bad request".to_string(),
            (Self::AuthenticationOrPermission, Some(403)) => "Permission denied".to_string(),
            (Self::AuthenticationOrPermission, _) => "Authentication failed".to_string(),
            (Self::NotFound, _) => "Resource not found".to_string(),
            (Self::Conflict, _) => "Conflict".to_string(),
            (Self::ValidationFailed, _) => "Validation failed".to_string(),
            (Self::RateLimited, _) => "Rate limit exceeded".to_string(),
            (Self::UpstreamServiceError, _) => "Upstream service error".to_string(),
            (Self::Unknown, Some(status)) => format!("API error ({})", status),
            (Self::Unknown, None) => "Unexpected error".to_string(),
        }
    }

    fn hint(self, status: Option<u16>) -> Option<&'static str> {
        match (self, status) {
            (Self::BadRequest, _) => Some("Please check your input parameters."),
            (Self::AuthenticationOrPermission, Some(403)) => {
                Some("The access token does not have sufficient permissions for this operation.")
            }
            (Self::AuthenticationOrPermission, _) => {
                Some("Please verify the management access token is valid.")
            }
            (Self::NotFound, _) => {
                Some("Please verify the ID and that the resource exists in your space.")
            }
            (Self::Conflict, _) => Some(
                "The resource may have been modified by another request. Fetch the latest version and try again.",
            ),
            (Self::ValidationFailed, _) => {
                Some("Please check that all required fields are provided and correctly formatted.")
            }
            (Self::RateLimited, _) => Some("Please wait a moment before retrying."),
            (Self::UpstreamServiceError, _) => Some("This is a temporary issue with the API servers."),
            (Self::Unknown, _) => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadRequest => "BadRequest",
            Self::AuthenticationOrPermission => "AuthenticationOrPermission",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::ValidationFailed => "ValidationFailed",
            Self::RateLimited => "RateLimited",
            Self::UpstreamServiceError => "UpstreamServiceError",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// What was being attempted when a call failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RequestMeta {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: None,
            id: None,
        }
    }

    pub fn resource(mut self, resource: impl Into<String>, id: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self.id = Some(id.into());
        self
    }
}

impl fmt::Display for RequestMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action)?;
        if let (Some(resource), Some(id)) = (&self.resource, &self.id) {
            write!(f, " ({} '{}')", resource, id)?;
        }
        Ok(())
    }
}

/// A failure normalised into the taxonomy, with its retry decision.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub retryable: bool,
    pub message: String,
    pub meta: Option<RequestMeta>,
    cause: Option<Arc<UpstreamError>>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            retryable: kind.is_retryable(),
            message: message.into(),
            meta: None,
            cause: None,
        }
    }

    /// A local configuration problem; never retryable.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, None, format!("Configuration error: {}", message.into()))
    }

    /// Attach the action being attempted. An existing meta is kept.
    pub fn with_meta(mut self, meta: RequestMeta) -> Self {
        if self.meta.is_none() {
            self.meta = Some(meta);
        }
        self
    }

    /// The raw failure this error was classified from.
    pub fn cause(&self) -> Option<&UpstreamError> {
        self.cause.as_deref()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.label(self.status))?;
        if let Some(meta) = &self.meta {
            write!(f, " while trying to {}", meta)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(hint) = self.kind.hint(self.status) {
            write!(f, ". {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Map a raw failure onto the taxonomy.
///
/// Retryable iff the status is 429 or 5xx. Failures without a status are
/// `Unknown` and never retried.
pub fn classify(error: UpstreamError) -> ClassifiedError {
    let status = error.status();
    let kind = status.map_or(ErrorKind::Unknown, ErrorKind::from_status);

    ClassifiedError {
        kind,
        status,
        retryable: kind.is_retryable(),
        message: error.detail(),
        meta: None,
        cause: Some(Arc::new(error)),
    }
}

impl From<UpstreamError> for ClassifiedError {
    fn from(error: UpstreamError) -> Self {
        classify(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_status_table() {
        let cases = [
            (400, ErrorKind::BadRequest, false),
            (401, ErrorKind::AuthenticationOrPermission, false),
            (403, ErrorKind::AuthenticationOrPermission, false),
            (404, ErrorKind::NotFound, false),
            (409, ErrorKind::Conflict, false),
            (422, ErrorKind::ValidationFailed, false),
            (429, ErrorKind::RateLimited, true),
            (500, ErrorKind::UpstreamServiceError, true),
            (502, ErrorKind::UpstreamServiceError, true),
            (503, ErrorKind::UpstreamServiceError, true),
            (504, ErrorKind::UpstreamServiceError, true),
            (418, ErrorKind::Unknown, false),
        ];

        for (status, kind, retryable) in cases {
            let classified = classify(UpstreamError::api(status, "boom"));
            assert_eq!(classified.kind, kind, "status {status}");
            assert_eq!(classified.retryable, retryable, "status {status}");
            assert_eq!(classified.status, Some(status));
        }
    }

    #[test]
    fn test_other_5xx_retryable() {
        let classified = classify(UpstreamError::api(507, "insufficient storage"));
        assert_eq!(classified.kind, ErrorKind::UpstreamServiceError);
        assert!(classified.retryable);
    }

    #[test]
    fn test_unrecognized_error_not_retryable() {
        let classified = classify(UpstreamError::Config("bad header".to_string()));
        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert!(!classified.retryable);
        assert!(classified.status.is_none());
        assert!(classified.to_string().starts_with("Unexpected error"));
    }

    #[test]
    fn test_from_response_parses_body() {
        let body = r#"{"sys":{"type":"Error","id":"VersionMismatch"},"message":"Version mismatch","requestId":"req-1"}"#;
        let error = UpstreamError::from_response(409, body);

        match &error {
            UpstreamError::Api { status, message, error_id, request_id } => {
                assert_eq!(*status, 409);
                assert_eq!(message, "Version mismatch");
                assert_eq!(error_id.as_deref(), Some("VersionMismatch"));
                assert_eq!(request_id.as_deref(), Some("req-1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_from_response_nested_status_wins() {
        let error = UpstreamError::from_response(400, r#"{"status":429,"message":"slow down"}"#);
        assert_eq!(error.status(), Some(429));
    }

    #[test]
    fn test_from_response_plain_text() {
        let error = UpstreamError::from_response(503, "Service Unavailable");
        assert_eq!(error.status(), Some(503));
        assert_eq!(classify(error).message, "Service Unavailable");
    }

    #[test]
    fn test_display_names_kind_and_action() {
        let error = classify(UpstreamError::api(404, "The resource could not be found"))
            .with_meta(RequestMeta::new("get entry").resource("entry", "abc"));

        let text = error.to_string();
        assert!(text.starts_with("Resource not found while trying to get entry (entry 'abc')"));
        assert!(text.contains("The resource could not be found"));
        assert!(text.contains("verify the ID"));
    }

    #[test]
    fn test_with_meta_keeps_first() {
        let error = ClassifiedError::new(ErrorKind::Conflict, Some(409), "stale")
            .with_meta(RequestMeta::new("publish entry"))
            .with_meta(RequestMeta::new("outer"));
        assert_eq!(error.meta.unwrap().action, "publish entry");
    }

    #[test]
    fn test_cause_preserved() {
        let error = classify(UpstreamError::api(500, "oops"));
        assert!(matches!(error.cause(), Some(UpstreamError::Api { status: 500, .. })));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_forbidden_label() {
        let error = classify(UpstreamError::api(403, "nope"));
        assert!(error.to_string().starts_with("Permission denied"));
    }
}
