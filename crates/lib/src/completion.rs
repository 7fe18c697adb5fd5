//! Completion gateway: one validated webhook message in, one webhook response out.
//!
//! Expected failures of the completion service (transport, HTTP status, malformed body,
//! timeout, missing credential) never escape; they become the apology response with an
//! `error` context key. Panics are left to the server's fault layer.

use crate::llm::{ChatMessage, CompletionBackend, CompletionError, CompletionRequest};
use crate::webhook::{merge_context, InboundMessage, OutboundMessage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Output budget per completion.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Sampling temperature per completion.
pub const TEMPERATURE: f32 = 0.7;

/// Reply text when the completion service fails.
pub const GATEWAY_APOLOGY: &str =
    "I apologize, but I'm having trouble understanding right now. Please try again.";

/// Context key holding the generated reply on success.
pub const LAST_RESPONSE_KEY: &str = "last_gpt_response";

/// Context key holding the failure description.
pub const ERROR_KEY: &str = "error";

const LOG_PREVIEW_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("completion timed out after {0:?}")]
    TimedOut(Duration),
    #[error("completion returned an empty reply")]
    EmptyReply,
}

/// Forwards webhook text to a [`CompletionBackend`] and shapes the reply.
pub struct CompletionGateway {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    timeout: Duration,
}

impl CompletionGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
        }
    }

    /// Produce the webhook response for `msg`. Always returns a response.
    /// `request_id` only tags log lines.
    pub async fn respond(&self, msg: &InboundMessage, request_id: Uuid) -> OutboundMessage {
        match self.generate(&msg.text).await {
            Ok(reply) => {
                log::info!("chat[{}]: completion generated: {}...", request_id, preview(&reply));
                let context = merge_context(
                    &msg.context,
                    [(LAST_RESPONSE_KEY.to_string(), Value::String(reply.clone()))],
                );
                OutboundMessage::text(reply, context)
            }
            Err(e) => {
                log::error!(
                    "chat[{}]: completion via {} failed: {}",
                    request_id,
                    self.backend.name(),
                    e
                );
                let context =
                    merge_context(&msg.context, [(ERROR_KEY.to_string(), Value::String(e.to_string()))]);
                OutboundMessage::text(GATEWAY_APOLOGY, context)
            }
        }
    }

    /// One bounded call to the backend. A blank reply counts as failure.
    pub async fn generate(&self, text: &str) -> Result<String, GatewayError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(text)],
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };
        let reply = tokio::time::timeout(self.timeout, self.backend.complete(&request))
            .await
            .map_err(|_| GatewayError::TimedOut(self.timeout))??;
        if reply.trim().is_empty() {
            return Err(GatewayError::EmptyReply);
        }
        Ok(reply)
    }
}

/// First [`LOG_PREVIEW_CHARS`] characters of `text`, for log lines.
pub(crate) fn preview(text: &str) -> &str {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
