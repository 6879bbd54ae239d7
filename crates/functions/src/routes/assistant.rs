//! Persona chat route handlers.
//!
//! A thin SSE proxy over the gateway's streaming chat completion. No
//! conversation state is kept server-side; the client sends the full
//! history on every request.

use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::gateway::ChatMessage;
use crate::services::assistant::AssistantError;
use crate::services::{AssistantService, Persona};
use crate::state::AppState;

/// Request body for a chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub persona: String,
    pub messages: Vec<ChatMessage>,
}

/// Stream a persona's reply as server-sent events.
///
/// POST /api/assistant/chat
///
/// Emits `data: {"delta": "..."}` events as text arrives, a terminal
/// `event: done`, and `event: error` if the upstream stream breaks after
/// headers have been sent. Bad personas and malformed conversations are
/// rejected before the stream opens, so those still surface as plain JSON
/// errors.
#[instrument(skip(state, request), fields(persona = %request.persona))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let persona = Persona::parse(&request.persona).ok_or_else(|| {
        AppError::Assistant(AssistantError::UnknownPersona(request.persona.clone()))
    })?;

    let service = AssistantService::new(state.gateway());
    let chunks = service.stream_chat(persona, request.messages).await?;

    let events = chunks
        .filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) => chunk
                    .delta_content()
                    .map(|delta| Event::default().data(json!({ "delta": delta }).to_string())),
                Err(error) => {
                    tracing::warn!(error = %error, "assistant stream interrupted");
                    Some(
                        Event::default()
                            .event("error")
                            .data(json!({ "error": "The stream was interrupted. Please retry." }).to_string()),
                    )
                }
            }
        })
        .chain(stream::once(async { Event::default().event("done").data("{}") }))
        .map(Ok);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
