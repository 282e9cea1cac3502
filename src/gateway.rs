//! Messaging gateway abstraction
//!
//! The dialog core only ever talks to the chat network through
//! [`MessagingGateway`]; the Telegram Bot API is the production transport.

mod error;
pub mod telegram;
mod types;

pub use error::{GatewayError, GatewayErrorKind};
pub use telegram::{Inbound, TelegramGateway};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Outbound side of the chat network
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a text message, optionally with keyboard markup
    async fn send_text(
        &self,
        conversation_id: &str,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<MessageRef, GatewayError>;

    /// Send a prompt with inline buttons, one per row, in the given order
    async fn send_buttons(
        &self,
        conversation_id: &str,
        prompt: &str,
        options: &[ButtonOption],
    ) -> Result<MessageRef, GatewayError>;

    /// Acknowledge a button press so the remote UI stops its loading indicator
    async fn answer_selection(&self, selection_id: &str) -> Result<(), GatewayError>;

    /// Replace the text of a previously delivered message
    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<(), GatewayError>;

    /// Send a stored photo with a caption
    async fn send_photo(
        &self,
        conversation_id: &str,
        photo: &PhotoRef,
        caption: &str,
    ) -> Result<MessageRef, GatewayError>;

    /// Pick the highest-resolution variant of an upload and return a
    /// reference that can be stored and sent back later
    async fn resolve_photo(&self, upload: &PhotoUpload) -> Result<PhotoRef, GatewayError>;
}

#[async_trait]
impl<T: MessagingGateway + ?Sized> MessagingGateway for Arc<T> {
    async fn send_text(
        &self,
        conversation_id: &str,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<MessageRef, GatewayError> {
        (**self).send_text(conversation_id, text, markup).await
    }

    async fn send_buttons(
        &self,
        conversation_id: &str,
        prompt: &str,
        options: &[ButtonOption],
    ) -> Result<MessageRef, GatewayError> {
        (**self).send_buttons(conversation_id, prompt, options).await
    }

    async fn answer_selection(&self, selection_id: &str) -> Result<(), GatewayError> {
        (**self).answer_selection(selection_id).await
    }

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<(), GatewayError> {
        (**self).edit_message(message, text).await
    }

    async fn send_photo(
        &self,
        conversation_id: &str,
        photo: &PhotoRef,
        caption: &str,
    ) -> Result<MessageRef, GatewayError> {
        (**self).send_photo(conversation_id, photo, caption).await
    }

    async fn resolve_photo(&self, upload: &PhotoUpload) -> Result<PhotoRef, GatewayError> {
        (**self).resolve_photo(upload).await
    }
}

/// Logging wrapper for gateways
pub struct LoggingGateway<G> {
    inner: Arc<G>,
}

impl<G: MessagingGateway> LoggingGateway<G> {
    pub fn new(inner: Arc<G>) -> Self {
        Self { inner }
    }
}

fn log_call<T>(call: &str, conversation_id: &str, started: Instant, result: &Result<T, GatewayError>) {
    let duration = started.elapsed();
    match result {
        Ok(_) => {
            tracing::debug!(
                call,
                conv_id = %conversation_id,
                duration_ms = %duration.as_millis(),
                "Gateway call completed"
            );
        }
        Err(e) => {
            tracing::error!(
                call,
                conv_id = %conversation_id,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                error = %e.message,
                "Gateway call failed"
            );
        }
    }
}

#[async_trait]
impl<G: MessagingGateway> MessagingGateway for LoggingGateway<G> {
    async fn send_text(
        &self,
        conversation_id: &str,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<MessageRef, GatewayError> {
        let started = Instant::now();
        let result = self.inner.send_text(conversation_id, text, markup).await;
        log_call("send_text", conversation_id, started, &result);
        result
    }

    async fn send_buttons(
        &self,
        conversation_id: &str,
        prompt: &str,
        options: &[ButtonOption],
    ) -> Result<MessageRef, GatewayError> {
        let started = Instant::now();
        let result = self.inner.send_buttons(conversation_id, prompt, options).await;
        log_call("send_buttons", conversation_id, started, &result);
        result
    }

    async fn answer_selection(&self, selection_id: &str) -> Result<(), GatewayError> {
        let started = Instant::now();
        let result = self.inner.answer_selection(selection_id).await;
        log_call("answer_selection", "-", started, &result);
        result
    }

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<(), GatewayError> {
        let started = Instant::now();
        let result = self.inner.edit_message(message, text).await;
        log_call("edit_message", &message.conversation_id, started, &result);
        result
    }

    async fn send_photo(
        &self,
        conversation_id: &str,
        photo: &PhotoRef,
        caption: &str,
    ) -> Result<MessageRef, GatewayError> {
        let started = Instant::now();
        let result = self.inner.send_photo(conversation_id, photo, caption).await;
        log_call("send_photo", conversation_id, started, &result);
        result
    }

    async fn resolve_photo(&self, upload: &PhotoUpload) -> Result<PhotoRef, GatewayError> {
        let started = Instant::now();
        let result = self.inner.resolve_photo(upload).await;
        log_call("resolve_photo", "-", started, &result);
        result
    }
}
