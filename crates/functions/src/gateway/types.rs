//! Types for the AI gateway.
//!
//! The gateway speaks the OpenAI-compatible chat completions and image edits
//! wire format, so these types match that shape regardless of which model is
//! routed behind it.

use serde::{Deserialize, Serialize};

/// The role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the whole conversation.
    System,
    /// The end user's messages.
    User,
    /// The model's messages.
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Response format constraint for a completion.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Force the model to emit a single valid JSON object.
    JsonObject,
}

/// Request body for the chat completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to route to.
    pub model: String,
    /// Conversation messages, system prompt included.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Output format constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Whether to stream the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// A complete (non-streaming) chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    /// Unique completion ID.
    pub id: String,
    /// Model that generated the completion.
    pub model: String,
    /// Candidate responses. In practice always exactly one.
    pub choices: Vec<Choice>,
    /// Token usage information.
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Content of the first choice, if the gateway returned any.
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// A single completion candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Index of this choice.
    pub index: u32,
    /// The generated message.
    pub message: AssistantMessage,
    /// Why generation stopped ("stop", "length", ...).
    pub finish_reason: Option<String>,
}

/// The assistant message inside a completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    /// Role, always "assistant".
    pub role: String,
    /// Generated text. Absent when the model produced nothing.
    pub content: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Number of prompt tokens.
    pub prompt_tokens: u32,
    /// Number of completion tokens.
    pub completion_tokens: u32,
    /// Total tokens billed.
    pub total_tokens: u32,
}

// =============================================================================
// Streaming Types
// =============================================================================

/// A streamed completion chunk.
///
/// The stream is a sequence of these, one per SSE `data:` line, terminated by
/// a literal `[DONE]` sentinel that the client consumes internally.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    /// Completion ID, stable across all chunks of one response.
    pub id: String,
    /// Delta choices.
    pub choices: Vec<ChunkChoice>,
}

impl ChatChunk {
    /// Text carried by this chunk's first choice, if any.
    #[must_use]
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }
}

/// A streamed choice delta.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Index of this choice.
    pub index: u32,
    /// The incremental update.
    pub delta: ChunkDelta,
    /// Set on the final content chunk.
    pub finish_reason: Option<String>,
}

/// Incremental message content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    /// Role, present only on the first chunk.
    pub role: Option<String>,
    /// Text to append.
    pub content: Option<String>,
}

// =============================================================================
// Image Types
// =============================================================================

/// Response from the image edits endpoint.
#[derive(Debug, Deserialize)]
pub struct ImageEditResponse {
    /// Generated images. In practice always exactly one.
    pub data: Vec<ImageDatum>,
}

/// A single generated image.
#[derive(Debug, Deserialize)]
pub struct ImageDatum {
    /// Base64-encoded image bytes (when `response_format` is `b64_json`).
    pub b64_json: Option<String>,
    /// Hosted URL (when the gateway stores the result itself).
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&Role::System).expect("serialize"),
            "\"system\""
        );
        assert_eq!(
            serde_json::to_string(&Role::Assistant).expect("serialize"),
            "\"assistant\""
        );
    }

    #[test]
    fn test_response_format_serialization() {
        let json = serde_json::to_string(&ResponseFormat::JsonObject).expect("serialize");
        assert_eq!(json, "{\"type\":\"json_object\"}");
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: None,
            temperature: None,
            response_format: None,
            stream: None,
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(!json.contains("max_tokens"));
        assert!(!json.contains("response_format"));
        assert!(!json.contains("stream"));
    }

    #[test]
    fn test_completion_first_content() {
        let completion: ChatCompletion = serde_json::from_value(serde_json::json!({
            "id": "cmpl-1",
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "hello" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4 }
        }))
        .expect("deserialize");

        assert_eq!(completion.first_content(), Some("hello"));
    }

    #[test]
    fn test_completion_without_content() {
        let completion: ChatCompletion = serde_json::from_value(serde_json::json!({
            "id": "cmpl-2",
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": null },
                "finish_reason": "content_filter"
            }],
            "usage": null
        }))
        .expect("deserialize");

        assert_eq!(completion.first_content(), None);
    }

    #[test]
    fn test_chunk_delta_content() {
        let chunk: ChatChunk = serde_json::from_value(serde_json::json!({
            "id": "cmpl-3",
            "choices": [{
                "index": 0,
                "delta": { "content": "to" },
                "finish_reason": null
            }]
        }))
        .expect("deserialize");

        assert_eq!(chunk.delta_content(), Some("to"));
    }

    #[test]
    fn test_chunk_with_empty_delta() {
        // The final chunk carries finish_reason and an empty delta.
        let chunk: ChatChunk = serde_json::from_value(serde_json::json!({
            "id": "cmpl-4",
            "choices": [{
                "index": 0,
                "delta": {},
                "finish_reason": "stop"
            }]
        }))
        .expect("deserialize");

        assert_eq!(chunk.delta_content(), None);
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
