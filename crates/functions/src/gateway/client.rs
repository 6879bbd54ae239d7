//! AI gateway client for chat and image generation.
//!
//! Provides both streaming and non-streaming access to the gateway's
//! OpenAI-compatible chat completions endpoint, plus image edits.

use std::sync::Arc;

use async_stream::stream;
use base64::Engine as _;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart;
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::GatewayConfig;

use super::error::{ApiErrorResponse, GatewayError};
use super::types::{
    ChatChunk, ChatCompletion, ChatMessage, ChatRequest, ImageEditResponse, ResponseFormat,
};

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// AI gateway client.
///
/// One client instance serves both the chat assistants and the image
/// pipeline; the configured chat and image models are routed by the gateway.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<GatewayClientInner>,
}

struct GatewayClientInner {
    client: reqwest::Client,
    base_url: String,
    chat_model: String,
    image_model: String,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// # Arguments
    ///
    /// * `config` - Gateway configuration containing base URL, API key, and models
    ///
    /// # Panics
    ///
    /// Panics if the API key contains invalid header characters.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        let api_key = config.api_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .expect("Invalid API key for header");
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(GatewayClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                chat_model: config.chat_model.clone(),
                image_model: config.image_model.clone(),
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a chat request and get a complete response.
    ///
    /// This is the non-streaming API, suitable for structured generation
    /// where the whole completion is parsed at once.
    ///
    /// # Arguments
    ///
    /// * `messages` - Conversation, system prompt included
    /// * `format` - Optional output constraint (JSON mode)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway rejects it.
    #[instrument(skip(self, messages), fields(model = %self.inner.chat_model))]
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        format: Option<ResponseFormat>,
    ) -> Result<ChatCompletion, GatewayError> {
        let request = ChatRequest {
            model: self.inner.chat_model.clone(),
            messages,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            temperature: None,
            response_format: format,
            stream: None,
        };

        let response = self
            .inner
            .client
            .post(self.endpoint("/chat/completions"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| GatewayError::Parse(format!("Failed to parse completion: {e}")))
        } else {
            Err(handle_error_status(status, response).await)
        }
    }

    /// Send a chat request and stream the response.
    ///
    /// Returns an owned stream of chunks for incremental display, detached
    /// from this client so handlers can hand it to an SSE response. The
    /// stream ends when the gateway sends its `[DONE]` sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial request fails.
    #[instrument(skip(self, messages), fields(model = %self.inner.chat_model))]
    pub async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<BoxStream<'static, Result<ChatChunk, GatewayError>>, GatewayError> {
        let request = ChatRequest {
            model: self.inner.chat_model.clone(),
            messages,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            temperature: None,
            response_format: None,
            stream: Some(true),
        };

        let response = self
            .inner
            .client
            .post(self.endpoint("/chat/completions"))
            .json(&request)
            .send()
            .await?;

        // Check for error responses before streaming
        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_status(status, response).await);
        }

        // Return a stream that parses SSE events
        let chunks = stream! {
            let mut buffer = String::new();
            let mut byte_stream = std::pin::pin!(response.bytes_stream());

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let text = match std::str::from_utf8(&chunk) {
                            Ok(t) => t,
                            Err(e) => {
                                yield Err(GatewayError::Parse(format!("Invalid UTF-8: {e}")));
                                continue;
                            }
                        };

                        buffer.push_str(text);

                        // Process complete SSE events
                        while let Some(event) = extract_sse_event(&mut buffer) {
                            match parse_sse_event(&event) {
                                ParsedEvent::Chunk(result) => yield result,
                                ParsedEvent::Done => return,
                                ParsedEvent::Skip => {}
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(GatewayError::Stream(e.to_string()));
                    }
                }
            }
        };

        Ok(chunks.boxed())
    }

    /// Edit an image and return the result's raw bytes.
    ///
    /// Sends the source image with an instruction prompt to the image edits
    /// endpoint and decodes the base64 result.
    ///
    /// # Arguments
    ///
    /// * `image` - Source image bytes
    /// * `filename` - Filename hint for the multipart upload
    /// * `prompt` - Edit instruction
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the gateway rejects it, or the
    /// response carries no image.
    #[instrument(skip(self, image, prompt), fields(model = %self.inner.image_model, bytes = image.len()))]
    pub async fn edit_image(
        &self,
        image: Vec<u8>,
        filename: &str,
        prompt: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        let part = multipart::Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/png")?;

        let form = multipart::Form::new()
            .part("image", part)
            .text("model", self.inner.image_model.clone())
            .text("prompt", prompt.to_string())
            .text("response_format", "b64_json");

        let response = self
            .inner
            .client
            .post(self.endpoint("/images/edits"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ImageEditResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Parse(format!("Failed to parse image response: {e}")))?;

        let datum = parsed.data.into_iter().next().ok_or(GatewayError::MissingContent)?;
        let encoded = datum.b64_json.ok_or(GatewayError::MissingContent)?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| GatewayError::Parse(format!("Invalid base64 image: {e}")))
    }
}

/// Map an error status code to a typed error.
async fn handle_error_status(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> GatewayError {
    // Check for rate limiting
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return GatewayError::RateLimited(retry_after);
    }

    // Billing problems are terminal until fixed, not retryable
    if status == reqwest::StatusCode::PAYMENT_REQUIRED {
        return GatewayError::PaymentRequired;
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return GatewayError::Unauthorized("Invalid API key".to_string());
    }

    // Try to parse the gateway's error envelope
    match response.text().await {
        Ok(body) => {
            if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                GatewayError::Api {
                    error_type: api_error
                        .error
                        .error_type
                        .unwrap_or_else(|| "unknown".to_string()),
                    message: api_error.error.message,
                }
            } else {
                GatewayError::Api {
                    error_type: "unknown".to_string(),
                    message: body,
                }
            }
        }
        Err(e) => GatewayError::Http(e),
    }
}

/// One parsed SSE event from the completion stream.
enum ParsedEvent {
    /// A data chunk (or a parse failure worth surfacing).
    Chunk(Result<ChatChunk, GatewayError>),
    /// The `[DONE]` sentinel: the stream is over.
    Done,
    /// Comment, keep-alive, or empty event.
    Skip,
}

/// Extract a complete SSE event from the buffer.
///
/// Returns `Some(event)` if a complete event was found (and removes it from buffer),
/// or `None` if no complete event is available yet.
fn extract_sse_event(buffer: &mut String) -> Option<String> {
    // SSE events are separated by double newlines
    buffer.find("\n\n").map(|idx| {
        let event = buffer[..idx].to_string();
        *buffer = buffer[idx + 2..].to_string();
        event
    })
}

/// Parse an SSE event string into a chunk.
fn parse_sse_event(event: &str) -> ParsedEvent {
    // Skip empty events
    if event.trim().is_empty() {
        return ParsedEvent::Skip;
    }

    // Parse SSE format: "data: <json>"
    let mut data_line = None;

    for line in event.lines() {
        if let Some(stripped) = line.strip_prefix("data: ") {
            data_line = Some(stripped);
        }
    }

    let Some(data) = data_line else {
        return ParsedEvent::Skip;
    };

    // The terminator is a literal sentinel, not JSON
    if data == "[DONE]" {
        return ParsedEvent::Done;
    }

    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => ParsedEvent::Chunk(Ok(chunk)),
        Err(e) => ParsedEvent::Chunk(Err(GatewayError::Parse(format!(
            "Failed to parse stream chunk: {e}"
        )))),
    }
}
