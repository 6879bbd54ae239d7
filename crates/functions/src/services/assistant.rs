//! Chat assistant personas.
//!
//! Two public personas ride the same streaming endpoint: Juniper, the
//! storefront shopping guide, and the mixology helper on recipe pages.
//! Conversations are stateless; the client sends the whole history each
//! turn and the persona's system prompt is prepended server-side.

use futures::stream::BoxStream;
use thiserror::Error;
use tracing::instrument;

use crate::gateway::{ChatChunk, ChatMessage, GatewayClient, GatewayError, Role};

/// Most messages accepted in one conversation turn.
const MAX_MESSAGES: usize = 32;

/// Longest accepted single message, in characters.
const MAX_MESSAGE_CHARS: usize = 4_000;

const JUNIPER_PROMPT: &str = "You are Juniper, the Wildcurrant shopping guide. Wildcurrant makes \
     non-alcoholic aperitifs and sparkling botanicals. Help shoppers pick products for their \
     taste, occasion, and budget; answer questions about ingredients, sweetness, and serving. \
     Be warm and brief. If asked about anything unrelated to Wildcurrant or its drinks, steer \
     the conversation back. Never invent products, prices, or stock levels.";

const MIXOLOGY_PROMPT: &str = "You are the Wildcurrant mixology helper. You suggest \
     zero-proof serves and riffs built on Wildcurrant non-alcoholic aperitifs and sparkling \
     botanicals. Give exact quantities, simple techniques, and sensible substitutions. Never \
     suggest adding alcohol. Keep answers short enough to mix from.";

/// A chat persona a client can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Shopping guide on the storefront.
    Juniper,
    /// Recipe-page mixology helper.
    Mixology,
}

impl Persona {
    /// Parse the wire name of a persona.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "juniper" => Some(Self::Juniper),
            "mixology" => Some(Self::Mixology),
            _ => None,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Juniper => "juniper",
            Self::Mixology => "mixology",
        }
    }

    const fn system_prompt(self) -> &'static str {
        match self {
            Self::Juniper => JUNIPER_PROMPT,
            Self::Mixology => MIXOLOGY_PROMPT,
        }
    }
}

/// Errors from starting a persona chat.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The request named a persona that does not exist.
    #[error("unknown persona: {0}")]
    UnknownPersona(String),

    /// The conversation itself is malformed.
    #[error("invalid conversation: {0}")]
    InvalidConversation(String),

    /// The gateway rejected the opening request.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Service for streaming persona chat.
pub struct AssistantService<'a> {
    gateway: &'a GatewayClient,
}

impl<'a> AssistantService<'a> {
    /// Create a new assistant service.
    #[must_use]
    pub const fn new(gateway: &'a GatewayClient) -> Self {
        Self { gateway }
    }

    /// Validate a conversation and stream the persona's reply.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::InvalidConversation`] before any gateway
    /// call for a bad conversation; gateway rejections of the opening
    /// request keep their own type so callers can map quota errors.
    #[instrument(skip(self, history), fields(persona = persona.as_str(), turns = history.len()))]
    pub async fn stream_chat(
        &self,
        persona: Persona,
        history: Vec<ChatMessage>,
    ) -> Result<BoxStream<'static, Result<ChatChunk, GatewayError>>, AssistantError> {
        let conversation = build_conversation(persona, history)?;
        Ok(self.gateway.chat_stream(conversation).await?)
    }
}

/// Prepend the persona prompt and vet the client-supplied history.
///
/// Clients may only speak as `user` and `assistant`; a history message
/// claiming the `system` role is rejected rather than silently dropped.
fn build_conversation(
    persona: Persona,
    history: Vec<ChatMessage>,
) -> Result<Vec<ChatMessage>, AssistantError> {
    if history.is_empty() {
        return Err(AssistantError::InvalidConversation(
            "messages must not be empty".to_string(),
        ));
    }
    if history.len() > MAX_MESSAGES {
        return Err(AssistantError::InvalidConversation(format!(
            "too many messages (limit {MAX_MESSAGES})"
        )));
    }

    for message in &history {
        if message.role == Role::System {
            return Err(AssistantError::InvalidConversation(
                "system messages are not accepted".to_string(),
            ));
        }
        if message.content.trim().is_empty() {
            return Err(AssistantError::InvalidConversation(
                "messages must not be blank".to_string(),
            ));
        }
        if message.content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AssistantError::InvalidConversation(format!(
                "message too long (limit {MAX_MESSAGE_CHARS} characters)"
            )));
        }
    }

    let mut conversation = Vec::with_capacity(history.len() + 1);
    conversation.push(ChatMessage::system(persona.system_prompt()));
    conversation.extend(history);
    Ok(conversation)
}
