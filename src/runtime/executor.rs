//! Conversation runtime executor

use super::traits::SessionStore;
use super::{DialogError, Envelope, Outcome};
use crate::dialog::{accepts, dismiss, reprompt, transition, Effect, Event, Session, TransitionError};
use crate::gateway::MessagingGateway;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Worker owning one conversation. Events are handled strictly one at a
/// time, in the order they were queued.
pub struct ConversationRuntime<G, S>
where
    G: MessagingGateway + 'static,
    S: SessionStore + 'static,
{
    conv_id: String,
    gateway: Arc<G>,
    store: Arc<S>,
    event_rx: mpsc::Receiver<Envelope>,
}

impl<G, S> ConversationRuntime<G, S>
where
    G: MessagingGateway + 'static,
    S: SessionStore + 'static,
{
    pub fn new(
        conv_id: impl Into<String>,
        gateway: Arc<G>,
        store: Arc<S>,
        event_rx: mpsc::Receiver<Envelope>,
    ) -> Self {
        Self {
            conv_id: conv_id.into(),
            gateway,
            store,
            event_rx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(conv_id = %self.conv_id, "Starting conversation runtime");

        while let Some(Envelope { event, reply }) = self.event_rx.recv().await {
            let result = self.process_event(event).await;
            if let Err(e) = &result {
                tracing::error!(conv_id = %self.conv_id, error = %e, "Error handling event");
            }
            // The caller may have stopped waiting; the event is handled either way
            let _ = reply.send(result);
        }

        tracing::info!(conv_id = %self.conv_id, "Conversation runtime stopped");
    }

    async fn process_event(&self, event: Event) -> Result<Outcome, DialogError> {
        let mut session = self
            .store
            .get(&self.conv_id)
            .unwrap_or_else(Session::completed);
        let state = session.state;

        if !accepts(state, event.kind()) {
            tracing::debug!(conv_id = %self.conv_id, %state, kind = ?event.kind(), "Ignoring event");
            return self.ignore(&session, &event).await;
        }

        // Effects may generate follow-up events (photo resolution)
        let mut events_to_process = vec![event];
        let mut outcome = Outcome::Ignored(state);

        while let Some(current_event) = events_to_process.pop() {
            let result = match transition(&session, &current_event) {
                Ok(r) => r,
                Err(TransitionError::MalformedSelection { state, value }) => {
                    tracing::info!(conv_id = %self.conv_id, %state, %value, "Rejecting malformed answer");
                    for effect in reprompt(state, &current_event) {
                        self.execute_effect(effect, &session).await?;
                    }
                    return Ok(Outcome::Rejected(state));
                }
                Err(e @ TransitionError::UnexpectedEvent { .. }) => {
                    tracing::debug!(conv_id = %self.conv_id, error = %e, "Ignoring event");
                    return self.ignore(&session, &current_event).await;
                }
            };

            tracing::info!(
                conv_id = %self.conv_id,
                from = %session.state,
                to = %result.session.state,
                "Dialog transition"
            );

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect, &result.session).await? {
                    events_to_process.push(generated);
                }
            }

            outcome = if result.session.state.is_terminal() {
                Outcome::Completed(result.summary)
            } else {
                Outcome::Advanced(result.session.state)
            };
            session = result.session;
        }

        Ok(outcome)
    }

    /// Leave the session alone, acknowledging a stale button press if any
    async fn ignore(&self, session: &Session, event: &Event) -> Result<Outcome, DialogError> {
        for effect in dismiss(event) {
            self.execute_effect(effect, session).await?;
        }
        Ok(Outcome::Ignored(session.state))
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(
        &self,
        effect: Effect,
        next: &Session,
    ) -> Result<Option<Event>, DialogError> {
        let conv_id = self.conv_id.as_str();
        match effect {
            Effect::SendText { text, markup } => {
                self.gateway.send_text(conv_id, &text, markup.as_ref()).await?;
                Ok(None)
            }

            Effect::SendButtons { prompt, options } => {
                self.gateway.send_buttons(conv_id, &prompt, &options).await?;
                Ok(None)
            }

            Effect::AnswerSelection { selection_id } => {
                self.gateway.answer_selection(&selection_id).await?;
                Ok(None)
            }

            Effect::EditMessage { message, text } => {
                self.gateway.edit_message(&message, &text).await?;
                Ok(None)
            }

            Effect::SendPhoto { photo, caption } => {
                self.gateway.send_photo(conv_id, &photo, &caption).await?;
                Ok(None)
            }

            Effect::ResolvePhoto { upload } => {
                let photo_ref = self.gateway.resolve_photo(&upload).await?;
                tracing::debug!(conv_id, photo = %photo_ref.as_str(), "Photo resolved");
                Ok(Some(Event::PhotoResolved { photo_ref }))
            }

            Effect::ResetSession => {
                self.store.create_or_reset(conv_id);
                Ok(None)
            }

            Effect::PersistSession => {
                let stored = self.store.update(conv_id, |s| *s = next.clone());
                if !stored {
                    tracing::warn!(conv_id, "No session to persist, dialog was not started");
                }
                Ok(None)
            }

            Effect::ClearSession => {
                self.store.clear(conv_id);
                Ok(None)
            }
        }
    }
}
