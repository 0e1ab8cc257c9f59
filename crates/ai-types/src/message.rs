//! Message and request types shared by the façade and the provider clients.

use serde::{Deserialize, Serialize};

use crate::ApiError;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation (OpenAI-style shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A provider-independent completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Check the request invariants: a non-empty message list, at most one
    /// system message which must come first, and a positive `max_tokens`.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.max_tokens == Some(0) {
            return Err(ApiError::InvalidRequest("max_tokens must be positive".into()));
        }
        if self.messages.is_empty() {
            return Err(ApiError::InvalidRequest("messages must not be empty".into()));
        }
        let misplaced = self
            .messages
            .iter()
            .skip(1)
            .any(|m| m.role == Role::System);
        if misplaced {
            return Err(ApiError::InvalidRequest(
                "a system message is only allowed as the first message".into(),
            ));
        }
        Ok(())
    }
}

/// Role in the native-alternate schema, which has no system channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeRole {
    User,
    Assistant,
}

/// A message in the native-alternate schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeMessage {
    pub role: NativeRole,
    pub content: String,
}

/// A request body for the native-alternate Messages endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct NativeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<NativeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub stream: bool,
}

/// A request body for OpenAI-compatible chat completions.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn validate_rejects_empty() {
        let req = CompletionRequest::new("m", vec![]);
        assert!(matches!(req.validate(), Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn validate_rejects_late_system_message() {
        let req = CompletionRequest::new(
            "m",
            vec![Message::user("hi"), Message::system("be brief")],
        );
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_accepts_leading_system_message() {
        let req = CompletionRequest::new(
            "m",
            vec![Message::system("be brief"), Message::user("hi")],
        );
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_max_tokens() {
        let req = CompletionRequest::new("m", vec![Message::user("hi")]).with_max_tokens(0);
        assert!(matches!(req.validate(), Err(ApiError::InvalidRequest(_))));
        let req = CompletionRequest::new("m", vec![Message::user("hi")]).with_max_tokens(1);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn chat_request_omits_absent_options() {
        let req = ChatRequest {
            model: "perplexity/sonar".into(),
            messages: vec![Message::user("q")],
            temperature: None,
            max_tokens: None,
            stream: false,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("temperature").is_none());
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn native_request_serializes_temperature_when_set() {
        let req = NativeRequest {
            model: "claude-3-opus-20240229".into(),
            max_tokens: 4000,
            messages: vec![NativeMessage {
                role: NativeRole::User,
                content: "hi".into(),
            }],
            temperature: Some(0.5),
            stream: true,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["max_tokens"], 4000);
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("temperature").is_some());
    }
}
