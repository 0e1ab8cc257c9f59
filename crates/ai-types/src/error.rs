//! Error hierarchy for ai.

use thiserror::Error;

/// Top-level error type for all ai operations.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Errors from the upstream gateway and the streaming machinery around it.
///
/// Every variant produced from an HTTP response carries the status code in its
/// `Display` output, because [`ErrorCategory::classify`] works on that text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed (HTTP 401): {message}")]
    Auth { message: String },

    #[error("Bad request (HTTP 400): {message}")]
    BadRequest { message: String },

    #[error("Rate limited (HTTP 429): {message}")]
    RateLimited { message: String },

    #[error("Server overloaded (HTTP 529)")]
    Overloaded,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Stream parse error: {0}")]
    StreamParse(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("no compatible model variant found")]
    NoCompatibleModel,

    #[error("Stream worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    /// User-facing category of this error, derived from its message text.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::classify(&self.to_string())
    }
}

/// Coarse, user-facing classification of upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// HTTP 403/404. The only category that triggers model fallback.
    AccessDenied,
    QuotaExhausted,
    Timeout,
    NetworkFailure,
    Unclassified,
}

/// Ordered `(substring, category)` rules; the first match wins.
const CATEGORY_RULES: &[(&str, ErrorCategory)] = &[
    ("403", ErrorCategory::AccessDenied),
    ("404", ErrorCategory::AccessDenied),
    ("insufficient_quota", ErrorCategory::QuotaExhausted),
    ("credits", ErrorCategory::QuotaExhausted),
    ("timeout", ErrorCategory::Timeout),
    ("network", ErrorCategory::NetworkFailure),
    ("connection", ErrorCategory::NetworkFailure),
];

impl ErrorCategory {
    /// Classify an error message by case-insensitive substring match.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        CATEGORY_RULES
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, category)| *category)
            .unwrap_or(ErrorCategory::Unclassified)
    }

    /// Short explanation shown to the user, if the category has one.
    pub fn describe(&self) -> Option<&'static str> {
        match self {
            ErrorCategory::AccessDenied => {
                Some("The model is not available on the gateway (check the model name)")
            }
            ErrorCategory::QuotaExhausted => Some("Not enough credits on the gateway account"),
            ErrorCategory::Timeout => Some("The API request timed out"),
            ErrorCategory::NetworkFailure => Some("Network problem while reaching the gateway"),
            ErrorCategory::Unclassified => None,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Created a default config file at {path}; add your gateway key to it")]
    Created { path: String },

    #[error("Config I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_access_denied() {
        assert_eq!(
            ErrorCategory::classify("Error code: 403 - forbidden"),
            ErrorCategory::AccessDenied
        );
        assert_eq!(
            ErrorCategory::classify("HTTP 404: model not found"),
            ErrorCategory::AccessDenied
        );
    }

    #[test]
    fn classify_quota() {
        assert_eq!(
            ErrorCategory::classify("Rate limited (HTTP 429): insufficient_quota"),
            ErrorCategory::QuotaExhausted
        );
        assert_eq!(
            ErrorCategory::classify("Not enough CREDITS"),
            ErrorCategory::QuotaExhausted
        );
    }

    #[test]
    fn classify_timeout_and_network() {
        assert_eq!(ErrorCategory::classify("Request Timeout"), ErrorCategory::Timeout);
        assert_eq!(
            ErrorCategory::classify("Network error: reset"),
            ErrorCategory::NetworkFailure
        );
        assert_eq!(
            ErrorCategory::classify("connection refused"),
            ErrorCategory::NetworkFailure
        );
    }

    #[test]
    fn classify_first_rule_wins() {
        // Both an access code and a network hint: access denied comes first.
        assert_eq!(
            ErrorCategory::classify("connection closed after 403"),
            ErrorCategory::AccessDenied
        );
    }

    #[test]
    fn classify_default_is_unclassified() {
        assert_eq!(ErrorCategory::classify("boom"), ErrorCategory::Unclassified);
        assert!(ErrorCategory::Unclassified.describe().is_none());
    }

    #[test]
    fn api_error_category_uses_display_text() {
        let err = ApiError::Http {
            status: 404,
            message: "not found".into(),
        };
        assert_eq!(err.category(), ErrorCategory::AccessDenied);
        assert_eq!(ApiError::Timeout.category(), ErrorCategory::Timeout);
        assert_eq!(
            ApiError::Network("dns".into()).category(),
            ErrorCategory::NetworkFailure
        );
        assert_eq!(
            ApiError::Http {
                status: 500,
                message: "internal".into()
            }
            .category(),
            ErrorCategory::Unclassified
        );
    }

    #[test]
    fn no_compatible_model_message() {
        assert_eq!(
            ApiError::NoCompatibleModel.to_string(),
            "no compatible model variant found"
        );
    }
}
