//! Async client for OpenAI-compatible chat completions (direct and relay).

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use ai_types::{ApiError, ChatProvider, ChatRequest, FragmentStream, ProviderFuture};
use futures_core::Stream;
use pin_project_lite::pin_project;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::http::{classify_error, transport_error};
use crate::sse::{SseEvent, SseParser};

/// Default request timeout for OpenAI-compatible endpoints.
pub const DEFAULT_COMPAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for `POST {base}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    name: String,
}

impl OpenAiCompatClient {
    /// Create a client. `name` is only used for logging ("openai", "relay").
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            name: name.into(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {}", self.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer).map_err(|_| ApiError::Auth {
                message: "Invalid API key format".into(),
            })?,
        );
        Ok(headers)
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(
            provider = %self.name,
            model = %request.model,
            stream = request.stream,
            "POST {url}"
        );

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }
}

impl ChatProvider for OpenAiCompatClient {
    fn stream_chat<'a>(&'a self, request: &'a ChatRequest) -> ProviderFuture<'a, FragmentStream> {
        Box::pin(async move {
            let mut request = request.clone();
            request.stream = true;
            let response = self.send(&request).await?;
            Ok(Box::pin(ChatChunkStream::new(response.bytes_stream())) as FragmentStream)
        })
    }

    fn complete_chat<'a>(&'a self, request: &'a ChatRequest) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            let mut request = request.clone();
            request.stream = false;
            let body = self
                .send(&request)
                .await?
                .text()
                .await
                .map_err(transport_error)?;
            parse_completion_text(&body)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pin_project! {
    /// Adapts a chat-completions SSE byte stream into content fragments.
    ///
    /// Empty and null deltas are skipped; `data: [DONE]` ends the stream.
    pub struct ChatChunkStream {
        #[pin]
        inner: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
        parser: SseParser,
        pending: VecDeque<Result<String, ApiError>>,
        finished: bool,
    }
}

impl ChatChunkStream {
    pub fn new(
        byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            parser: SseParser::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

/// Queue the items of `events` in order. Returns `true` once the stream is
/// over: `[DONE]` was seen, or an error was queued behind the fragments
/// that preceded it.
fn enqueue_events(
    events: impl IntoIterator<Item = SseEvent>,
    pending: &mut VecDeque<Result<String, ApiError>>,
) -> bool {
    for event in events {
        if event.is_done() {
            return true;
        }
        match parse_chunk_content(&event.data) {
            Ok(Some(text)) => pending.push_back(Ok(text)),
            Ok(None) => {}
            Err(e) => {
                pending.push_back(Err(e));
                return true;
            }
        }
    }
    false
}

impl Stream for ChatChunkStream {
    type Item = Result<String, ApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let events = this.parser.feed_bytes(&bytes);
                    *this.finished = enqueue_events(events, this.pending);
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    this.pending.push_back(Err(transport_error(e)));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    enqueue_events(this.parser.finish(), this.pending);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// Extract a non-empty content delta from one streamed chunk.
fn parse_chunk_content(data: &str) -> Result<Option<String>, ApiError> {
    #[derive(Deserialize)]
    struct Chunk {
        #[serde(default)]
        choices: Vec<ChunkChoice>,
        error: Option<serde_json::Value>,
    }

    let chunk: Chunk = serde_json::from_str(data)
        .map_err(|e| ApiError::StreamParse(format!("chat chunk: {e}")))?;

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ApiError::Upstream(message));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|s| !s.is_empty()))
}

/// Extract `choices[0].message.content` from a single-shot response.
fn parse_completion_text(body: &str) -> Result<String, ApiError> {
    #[derive(Deserialize)]
    struct Completion {
        choices: Vec<CompletionChoice>,
    }
    #[derive(Deserialize)]
    struct CompletionChoice {
        message: CompletionMessage,
    }
    #[derive(Deserialize)]
    struct CompletionMessage {
        content: Option<String>,
    }

    let completion: Completion = serde_json::from_str(body)
        .map_err(|e| ApiError::StreamParse(format!("chat completion: {e}")))?;
    Ok(completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default())
}
