//! Blocking client for the native-alternate (Anthropic Messages) family.
//!
//! Calls block the calling thread; [`crate::bridge`] runs them on a worker
//! thread. A fresh `reqwest::blocking::Client` is built per call on that
//! thread and must never be created or dropped inside the async runtime.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use ai_types::{ApiError, NativeProvider, NativeRequest};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::http::{ANTHROPIC_VERSION, classify_error, read_error, transport_error};
use crate::sse::{SseEvent, SseParser};

/// Default per-request timeout; long answers at 4000 tokens take minutes.
pub const DEFAULT_NATIVE_TIMEOUT: Duration = Duration::from_secs(600);

/// Blocking client for `POST {base}/v1/messages`.
#[derive(Clone)]
pub struct NativeClient {
    api_key: String,
    base_url: String,
}

impl NativeClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|_| ApiError::Auth {
                message: "Invalid API key format".into(),
            })?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    /// Send the request and return the response if its status is a success.
    fn send(&self, request: &NativeRequest) -> Result<Response, ApiError> {
        let url = format!("{}/v1/messages", self.base_url);
        let http = Client::builder()
            .timeout(DEFAULT_NATIVE_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        tracing::debug!(model = %request.model, stream = request.stream, "POST {url}");

        let response = http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }
}

impl NativeProvider for NativeClient {
    fn stream_text(
        &self,
        request: &NativeRequest,
        on_text: &mut dyn FnMut(String),
    ) -> Result<(), ApiError> {
        let mut request = request.clone();
        request.stream = true;
        let response = self.send(&request)?;
        read_event_stream(BufReader::new(response), on_text)
    }

    fn create_text(&self, request: &NativeRequest) -> Result<String, ApiError> {
        let mut request = request.clone();
        request.stream = false;
        let body = self
            .send(&request)?
            .text()
            .map_err(transport_error)?;
        parse_message_text(&body)
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Events of the Messages streaming protocol that matter for text output.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NativeEvent {
    ContentBlockDelta { delta: NativeDelta },
    MessageStop,
    Error { error: NativeErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NativeDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct NativeErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

enum Flow {
    Continue,
    Stop,
}

/// Read an SSE body line by line, forwarding text deltas as they arrive.
fn read_event_stream(
    mut reader: impl BufRead,
    on_text: &mut dyn FnMut(String),
) -> Result<(), ApiError> {
    let mut parser = SseParser::new();
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(read_error)?;
        if read == 0 {
            break;
        }
        for event in parser.feed(&line) {
            if let Flow::Stop = dispatch_event(&event, on_text)? {
                return Ok(());
            }
        }
    }

    if let Some(event) = parser.finish() {
        dispatch_event(&event, on_text)?;
    }
    Ok(())
}

fn dispatch_event(event: &SseEvent, on_text: &mut dyn FnMut(String)) -> Result<Flow, ApiError> {
    let parsed: NativeEvent = serde_json::from_str(&event.data).map_err(|e| {
        let kind = event.event_type.as_deref().unwrap_or("data");
        ApiError::StreamParse(format!("{kind}: {e}"))
    })?;

    match parsed {
        NativeEvent::ContentBlockDelta {
            delta: NativeDelta::TextDelta { text },
        } => {
            if !text.is_empty() {
                on_text(text);
            }
            Ok(Flow::Continue)
        }
        NativeEvent::MessageStop => Ok(Flow::Stop),
        NativeEvent::Error { error } => Err(ApiError::Upstream(format!(
            "{}: {}",
            error.error_type, error.message
        ))),
        NativeEvent::ContentBlockDelta { .. } | NativeEvent::Other => Ok(Flow::Continue),
    }
}

/// Extract the answer text from a non-streaming Messages response.
fn parse_message_text(body: &str) -> Result<String, ApiError> {
    #[derive(Deserialize)]
    struct MessageResponse {
        content: Vec<ContentBlock>,
    }
    #[derive(Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum ContentBlock {
        Text {
            text: String,
        },
        #[serde(other)]
        Other,
    }

    let response: MessageResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::StreamParse(format!("message response: {e}")))?;
    Ok(response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .unwrap_or_default())
}
