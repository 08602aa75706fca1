//! Error taxonomy for banking operations.
//!
//! This module provides:
//! - [`ErrorCode`]: the closed set of failure codes every institution maps into
//! - [`ProviderError`]: the failure branch of the result envelope
//! - [`ConfigError`]: construction-time settings resolution failures

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::Environment;
use crate::models::{Institution, RequestId};

/// Closed taxonomy of failure codes.
///
/// Every failure surfaced by an adapter carries exactly one of these codes.
/// Institution-specific failure reasons are translated into the taxonomy at
/// the adapter boundary; raw backend error strings never reach callers as
/// the primary classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidParameters,
    InvalidFilters,
    InvalidAmount,
    InvalidKeyType,
    InvalidPixKey,
    InsufficientFunds,
    NotSupported,
    Timeout,
    ConnectionError,
    NotImplemented,
    RateLimited,
    Unauthorized,
    NotFound,
    /// Otherwise-unclassified non-2xx response, carrying the HTTP status.
    Http(u16),
    UnknownError,
}

impl ErrorCode {
    /// Derive a code from an HTTP status.
    ///
    /// Well-known statuses map to named codes; anything else becomes
    /// [`ErrorCode::Http`] with the status attached.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            501 => Self::NotImplemented,
            other => Self::Http(other),
        }
    }

    /// Whether a retry of the same call could plausibly succeed.
    ///
    /// Used for log-level selection, not for automatic retries.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionError | Self::RateLimited => true,
            Self::Http(status) => (500..=599).contains(status),
            _ => false,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParameters => write!(f, "INVALID_PARAMETERS"),
            Self::InvalidFilters => write!(f, "INVALID_FILTERS"),
            Self::InvalidAmount => write!(f, "INVALID_AMOUNT"),
            Self::InvalidKeyType => write!(f, "INVALID_KEY_TYPE"),
            Self::InvalidPixKey => write!(f, "INVALID_PIX_KEY"),
            Self::InsufficientFunds => write!(f, "INSUFFICIENT_FUNDS"),
            Self::NotSupported => write!(f, "NOT_SUPPORTED"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::ConnectionError => write!(f, "CONNECTION_ERROR"),
            Self::NotImplemented => write!(f, "NOT_IMPLEMENTED"),
            Self::RateLimited => write!(f, "RATE_LIMITED"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Http(status) => write!(f, "HTTP_{status}"),
            Self::UnknownError => write!(f, "UNKNOWN_ERROR"),
        }
    }
}

/// The failure branch of the result envelope.
///
/// Carries the same call metadata as the success branch (institution,
/// request id, timestamp) plus the code, a human message and, when the
/// backend supplied one, the raw structured error body. Credentials are
/// never placed in `details`.
#[derive(Debug, Error)]
#[error("{institution} {code}: {message}")]
pub struct ProviderError {
    pub code: ErrorCode,
    pub institution: Institution,
    pub message: String,
    pub request_id: RequestId,
    pub timestamp: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

impl ProviderError {
    pub fn new(institution: Institution, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            institution,
            message: message.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            details: None,
        }
    }

    /// Attach the backend's structured error body.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Re-code an already-built failure, keeping metadata and details.
    pub fn recoded(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
        self.code = code;
        self.message = message.into();
        self
    }

    /// Failure for an operation outside the institution's capability set.
    pub fn unsupported(institution: Institution, operation: &str) -> Self {
        Self::new(
            institution,
            ErrorCode::NotSupported,
            format!("{operation} is not supported by {institution}"),
        )
    }

    /// Failure for a request that exceeded the institution's hard timeout.
    pub fn timeout(institution: Institution) -> Self {
        Self::new(institution, ErrorCode::Timeout, "request timed out")
    }

    /// Failure derived from a non-2xx HTTP status.
    pub fn from_status(
        institution: Institution,
        status: u16,
        body: Option<serde_json::Value>,
    ) -> Self {
        let error = Self::new(
            institution,
            ErrorCode::from_status(status),
            format!("backend returned HTTP {status}"),
        );
        match body {
            Some(body) => error.with_details(body),
            None => error,
        }
    }

    /// Synthetic fan-out entry for an identity with no registered adapter.
    pub fn not_registered(institution: Institution) -> Self {
        Self::new(
            institution,
            ErrorCode::InvalidParameters,
            format!("{institution} is not registered"),
        )
    }
}

/// Settings resolution failures.
///
/// These are construction-time errors: an institution outside the settings
/// registry, or a registered institution with no settings for the requested
/// environment. There is no silent fallback.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown institution: {0}")]
    UnknownInstitution(Institution),

    #[error("{institution} has no settings for the {environment} environment")]
    UnknownEnvironment {
        institution: Institution,
        environment: Environment,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_from_status() {
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(403), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(408), ErrorCode::Timeout);
        assert_eq!(ErrorCode::from_status(429), ErrorCode::RateLimited);
        assert_eq!(ErrorCode::from_status(501), ErrorCode::NotImplemented);
        assert_eq!(ErrorCode::from_status(502), ErrorCode::Http(502));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ErrorCode::Timeout.is_transient());
        assert!(ErrorCode::ConnectionError.is_transient());
        assert!(ErrorCode::RateLimited.is_transient());
        assert!(ErrorCode::Http(503).is_transient());
        assert!(!ErrorCode::Http(422).is_transient());
        assert!(!ErrorCode::InsufficientFunds.is_transient());
        assert!(!ErrorCode::NotSupported.is_transient());
    }

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::InvalidPixKey.to_string(), "INVALID_PIX_KEY");
        assert_eq!(ErrorCode::Http(502).to_string(), "HTTP_502");
        assert_eq!(ErrorCode::UnknownError.to_string(), "UNKNOWN_ERROR");
    }

    #[test]
    fn test_provider_error_carries_call_metadata() {
        let error = ProviderError::new(
            Institution::Bmp,
            ErrorCode::InsufficientFunds,
            "balance too low",
        );
        assert_eq!(error.institution, Institution::Bmp);
        assert!(!error.request_id.is_empty());
        assert!(error.details.is_none());
    }

    #[test]
    fn test_from_status_attaches_body() {
        let body = serde_json::json!({"mensagem": "saldo insuficiente"});
        let error = ProviderError::from_status(Institution::Bmp, 422, Some(body.clone()));
        assert_eq!(error.code, ErrorCode::Http(422));
        assert_eq!(error.details, Some(body));
    }

    #[test]
    fn test_recoded_preserves_details() {
        let body = serde_json::json!({"mensagem": "chave nao encontrada"});
        let error = ProviderError::from_status(Institution::Bmp, 422, Some(body.clone()))
            .recoded(ErrorCode::InvalidPixKey, "pix key not found");
        assert_eq!(error.code, ErrorCode::InvalidPixKey);
        assert_eq!(error.details, Some(body));
    }
}
