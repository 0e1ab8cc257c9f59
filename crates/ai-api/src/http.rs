//! HTTP status and transport error mapping shared by both clients.

use ai_types::ApiError;

/// The Anthropic API version header value.
pub(crate) const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Classify an HTTP error response into a typed ApiError.
///
/// The upstream `error.message` is extracted when the body is JSON; the
/// `error.type` (e.g. `insufficient_quota`) is kept alongside it so the
/// substring classifier can still see it.
pub(crate) fn classify_error(status: u16, body: &str) -> ApiError {
    let message = error_message(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("status {status}")
        } else {
            trimmed.to_string()
        }
    });

    match status {
        401 => ApiError::Auth { message },
        400 => ApiError::BadRequest { message },
        429 => ApiError::RateLimited { message },
        529 => ApiError::Overloaded,
        _ => ApiError::Http { status, message },
    }
}

fn error_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<ErrorField>,
    }
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Detail {
            message: Option<String>,
            #[serde(rename = "type")]
            error_type: Option<String>,
            code: Option<serde_json::Value>,
        },
        Text(String),
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.error? {
        ErrorField::Text(text) => Some(text),
        ErrorField::Detail {
            message,
            error_type,
            code,
        } => {
            let kind = error_type.or_else(|| code.and_then(|c| c.as_str().map(str::to_string)));
            match (message, kind) {
                (Some(m), Some(k)) if !m.contains(&k) => Some(format!("{m} ({k})")),
                (Some(m), _) => Some(m),
                (None, Some(k)) => Some(k),
                (None, None) => None,
            }
        }
    }
}

/// Map an async transport error.
pub(crate) fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Map an I/O error raised while reading a blocking response body.
pub(crate) fn read_error(e: std::io::Error) -> ApiError {
    if e.kind() == std::io::ErrorKind::TimedOut {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}
