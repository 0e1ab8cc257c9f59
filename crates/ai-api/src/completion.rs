//! Unified completion façade over the native and OpenAI-compatible families.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use ai_types::{
    ApiError, ChatProvider, CompletionRequest, ErrorCategory, FragmentStream, NativeProvider,
};
use futures_util::{StreamExt, TryStreamExt, stream};

use crate::aggregate::aggregate;
use crate::bridge::{self, BridgeConfig};
use crate::compat::OpenAiCompatClient;
use crate::native::NativeClient;
use crate::router::{Endpoints, ProviderFamily};
use crate::translate::{chat_request, native_request};

/// Alternate native model spellings tried, after the requested model, when
/// the gateway denies access to the requested one.
pub const DEFAULT_FALLBACK_MODELS: [&str; 3] = [
    "claude-opus-4-5-20251101",
    "claude-3-opus-20240229",
    "claude-3-5-sonnet-20241022",
];

/// Routes completion requests to the right provider and normalizes their
/// output into one [`FragmentStream`].
#[derive(Clone)]
pub struct CompletionClient {
    native: Arc<dyn NativeProvider>,
    direct: Arc<dyn ChatProvider>,
    relay: Arc<dyn ChatProvider>,
    fallback_models: Vec<String>,
    bridge: BridgeConfig,
}

impl CompletionClient {
    pub fn new(
        native: Arc<dyn NativeProvider>,
        direct: Arc<dyn ChatProvider>,
        relay: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            native,
            direct,
            relay,
            fallback_models: DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            bridge: BridgeConfig::default(),
        }
    }

    /// Build the HTTP-backed client: one credential for all three families.
    ///
    /// `timeout` applies to the OpenAI-compatible clients; the native client
    /// keeps its longer default.
    pub fn from_endpoints(
        api_key: &str,
        endpoints: &Endpoints,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let native = NativeClient::new(api_key, &endpoints.native);
        let direct = OpenAiCompatClient::new("openai", api_key, &endpoints.direct, timeout)?;
        let relay = OpenAiCompatClient::new("relay", api_key, &endpoints.relay, timeout)?;
        Ok(Self::new(
            Arc::new(native),
            Arc::new(direct),
            Arc::new(relay),
        ))
    }

    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = models;
        self
    }

    pub fn with_bridge_config(mut self, config: BridgeConfig) -> Self {
        self.bridge = config;
        self
    }

    /// Stream the answer to `request`.
    ///
    /// Nothing is sent until the stream is first polled. Validation errors
    /// and upstream failures arrive as the stream's last item.
    pub fn complete(&self, request: CompletionRequest) -> FragmentStream {
        let state = (self.clone(), Phase::Start(request));
        let fragments = stream::unfold(state, |(client, phase)| async move {
            let (item, next) = client.advance(phase).await?;
            Some((item, (client, next)))
        });
        Box::pin(fragments.fuse())
    }

    /// Non-streaming completion: the full answer as one string.
    pub async fn complete_text(&self, request: CompletionRequest) -> Result<String, ApiError> {
        let mut fragments = self.complete(request.streaming(false));
        aggregate(&mut fragments).await
    }

    /// Drive the state machine until it has an item to yield or is done.
    async fn advance(&self, mut phase: Phase) -> Option<(Result<String, ApiError>, Phase)> {
        loop {
            phase = match phase {
                Phase::Finished => return None,

                Phase::Start(request) => {
                    if let Err(e) = request.validate() {
                        return Some((Err(e), Phase::Finished));
                    }
                    let family = ProviderFamily::classify(&request.model);
                    tracing::debug!(
                        model = %request.model,
                        family = family.as_str(),
                        stream = request.stream,
                        "Starting completion"
                    );
                    let stream = self.open(family, &request, &request.model);
                    Phase::Primary {
                        request,
                        family,
                        stream,
                        yielded: false,
                    }
                }

                Phase::Primary {
                    request,
                    family,
                    mut stream,
                    yielded,
                } => match stream.next().await {
                    Some(Ok(text)) => {
                        let next = Phase::Primary {
                            request,
                            family,
                            stream,
                            yielded: true,
                        };
                        return Some((Ok(text), next));
                    }
                    None => return None,
                    Some(Err(e)) if should_fall_back(family, &e, yielded) => {
                        tracing::warn!(
                            model = %request.model,
                            "Model unavailable ({e}); trying alternate model names"
                        );
                        let candidates = std::iter::once(request.model.clone())
                            .chain(self.fallback_models.iter().cloned())
                            .collect();
                        Phase::Fallback {
                            request,
                            candidates,
                            current: None,
                        }
                    }
                    Some(Err(e)) => {
                        log_failure(family, &e);
                        return Some((Err(e), Phase::Finished));
                    }
                },

                Phase::Fallback {
                    request,
                    mut candidates,
                    current: None,
                } => match candidates.pop_front() {
                    Some(model) => {
                        tracing::debug!(model = %model, "Trying fallback model");
                        let stream = self.open_native(&request, &model);
                        Phase::Fallback {
                            request,
                            candidates,
                            current: Some(Candidate {
                                model,
                                stream,
                                yielded: false,
                            }),
                        }
                    }
                    None => {
                        let e = ApiError::NoCompatibleModel;
                        log_failure(ProviderFamily::NativeAlt, &e);
                        return Some((Err(e), Phase::Finished));
                    }
                },

                Phase::Fallback {
                    request,
                    candidates,
                    current: Some(mut candidate),
                } => match candidate.stream.next().await {
                    Some(Ok(text)) => {
                        candidate.yielded = true;
                        let next = Phase::Fallback {
                            request,
                            candidates,
                            current: Some(candidate),
                        };
                        return Some((Ok(text), next));
                    }
                    None => {
                        tracing::info!(model = %candidate.model, "Fallback model succeeded");
                        return None;
                    }
                    Some(Err(e)) if !candidate.yielded => {
                        tracing::warn!(model = %candidate.model, "Fallback model failed: {e}");
                        Phase::Fallback {
                            request,
                            candidates,
                            current: None,
                        }
                    }
                    Some(Err(e)) => {
                        log_failure(ProviderFamily::NativeAlt, &e);
                        return Some((Err(e), Phase::Finished));
                    }
                },
            };
        }
    }

    fn open(&self, family: ProviderFamily, request: &CompletionRequest, model: &str) -> FragmentStream {
        match family {
            ProviderFamily::NativeAlt => self.open_native(request, model),
            ProviderFamily::OpenAiCompatDirect => open_chat(Arc::clone(&self.direct), request),
            ProviderFamily::OpenAiCompatRelay => open_chat(Arc::clone(&self.relay), request),
        }
    }

    /// Native family: the bridge when streaming, the blocking pool otherwise.
    fn open_native(&self, request: &CompletionRequest, model: &str) -> FragmentStream {
        let native = native_request(request, model);
        let provider = Arc::clone(&self.native);

        if request.stream {
            return bridge::spawn_stream(self.bridge, move |emit| {
                provider.stream_text(&native, emit)
            });
        }

        let single = stream::once(async move {
            tokio::task::spawn_blocking(move || provider.create_text(&native))
                .await
                .unwrap_or_else(|e| Err(ApiError::Worker(e.to_string())))
        });
        Box::pin(single.fuse())
    }
}

/// OpenAI-compatible families: native async streaming or a single call.
fn open_chat(provider: Arc<dyn ChatProvider>, request: &CompletionRequest) -> FragmentStream {
    let chat = chat_request(request);
    if chat.stream {
        let opened = stream::once(async move { provider.stream_chat(&chat).await });
        Box::pin(opened.try_flatten().fuse())
    } else {
        let single = stream::once(async move { provider.complete_chat(&chat).await });
        Box::pin(single.fuse())
    }
}

/// Only an access failure of the native family, before any text was
/// produced, is retried under alternate model names.
fn should_fall_back(family: ProviderFamily, error: &ApiError, yielded: bool) -> bool {
    family == ProviderFamily::NativeAlt
        && !yielded
        && error.category() == ErrorCategory::AccessDenied
}

fn log_failure(family: ProviderFamily, error: &ApiError) {
    tracing::error!(
        family = family.as_str(),
        category = ?error.category(),
        "Completion failed: {error}"
    );
}

struct Candidate {
    model: String,
    stream: FragmentStream,
    yielded: bool,
}

enum Phase {
    Start(CompletionRequest),
    Primary {
        request: CompletionRequest,
        family: ProviderFamily,
        stream: FragmentStream,
        yielded: bool,
    },
    Fallback {
        request: CompletionRequest,
        candidates: VecDeque<String>,
        current: Option<Candidate>,
    },
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_only_for_native_access_denied() {
        let denied = ApiError::Http {
            status: 404,
            message: "model not found".into(),
        };
        assert!(should_fall_back(ProviderFamily::NativeAlt, &denied, false));
        assert!(!should_fall_back(ProviderFamily::NativeAlt, &denied, true));
        assert!(!should_fall_back(
            ProviderFamily::OpenAiCompatRelay,
            &denied,
            false
        ));
        assert!(!should_fall_back(
            ProviderFamily::NativeAlt,
            &ApiError::Timeout,
            false
        ));
    }

    #[test]
    fn default_fallback_list() {
        assert_eq!(DEFAULT_FALLBACK_MODELS[0], "claude-opus-4-5-20251101");
        assert_eq!(DEFAULT_FALLBACK_MODELS.len(), 3);
    }

    #[test]
    fn from_endpoints_builds() {
        let client = CompletionClient::from_endpoints(
            "sk-test",
            &Endpoints::default(),
            Duration::from_secs(60),
        )
        .unwrap();
        assert_eq!(client.fallback_models.len(), 3);
    }
}
