//! Request shaping for the two protocol families.

use ai_types::{
    ChatRequest, CompletionRequest, Message, NativeMessage, NativeRequest, NativeRole, Role,
};

/// `max_tokens` sent to the native family when the caller gave none.
pub const DEFAULT_NATIVE_MAX_TOKENS: u32 = 4000;

/// Prefix given to a system prompt folded into the first user message.
const SYSTEM_PREFIX: &str = "System: ";

/// Translate OpenAI-style messages for a provider without a system channel.
///
/// The system message (if any, and non-empty) becomes a leading `user`
/// message prefixed with `"System: "`; every other message keeps its role,
/// content and order.
pub fn translate_messages(messages: &[Message]) -> Vec<NativeMessage> {
    let mut system = None;
    let mut translated = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => system = Some(msg.content.as_str()),
            Role::User => translated.push(NativeMessage {
                role: NativeRole::User,
                content: msg.content.clone(),
            }),
            Role::Assistant => translated.push(NativeMessage {
                role: NativeRole::Assistant,
                content: msg.content.clone(),
            }),
        }
    }

    if let Some(text) = system.filter(|s| !s.is_empty()) {
        translated.insert(
            0,
            NativeMessage {
                role: NativeRole::User,
                content: format!("{SYSTEM_PREFIX}{text}"),
            },
        );
    }

    translated
}

/// Build a native-family request for `model` (which may differ from the
/// requested model during fallback).
pub fn native_request(request: &CompletionRequest, model: &str) -> NativeRequest {
    NativeRequest {
        model: model.to_string(),
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_NATIVE_MAX_TOKENS),
        messages: translate_messages(&request.messages),
        temperature: request.temperature,
        stream: request.stream,
    }
}

/// Build an OpenAI-compatible request. Messages pass through unmodified and
/// `max_tokens` is only sent when provided.
pub fn chat_request(request: &CompletionRequest) -> ChatRequest {
    ChatRequest {
        model: request.model.clone(),
        messages: request.messages.clone(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: request.stream,
    }
}
