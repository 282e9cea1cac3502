//! Dialog controller
//!
//! Each conversation gets its own runtime task fed through a queue, so
//! events for one conversation are handled in arrival order while
//! different conversations proceed independently.

mod executor;
mod store;
pub mod traits;


pub use executor::ConversationRuntime;
pub use store::InMemorySessionStore;
pub use traits::SessionStore;

use crate::dialog::{DialogState, Event, Summary};
use crate::gateway::{GatewayError, MessagingGateway};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

/// Default queue depth per conversation
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Controller tunables, passed in at construction
#[derive(Debug, Clone)]
pub struct DialogConfig {
    /// Events buffered per conversation before `submit` turns new ones away
    pub queue_capacity: usize,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// What handling one inbound event did to its conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Moved to (or restarted at) a non-terminal state
    Advanced(DialogState),
    /// Reached `Completed`; the summary is absent when the user cancelled
    Completed(Option<Summary>),
    /// Answer outside the offered options; the prompt was sent again
    Rejected(DialogState),
    /// No transition registered for this event in the current state
    Ignored(DialogState),
}

/// Errors surfaced to callers of the controller
#[derive(Debug, Error)]
pub enum DialogError {
    #[error("Gateway delivery failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Conversation runtime for {0} is unavailable")]
    RuntimeUnavailable(String),
    #[error("Conversation {0} has too many events queued")]
    Busy(String),
}

/// An event queued for a conversation runtime, with the channel its
/// outcome is reported on
pub struct Envelope {
    pub event: Event,
    pub reply: oneshot::Sender<Result<Outcome, DialogError>>,
}

/// Pending result of a submitted event
pub type OutcomeReceiver = oneshot::Receiver<Result<Outcome, DialogError>>;

/// Manager for all conversation runtimes
pub struct DialogManager<G, S>
where
    G: MessagingGateway + 'static,
    S: SessionStore + 'static,
{
    gateway: Arc<G>,
    store: Arc<S>,
    config: DialogConfig,
    runtimes: RwLock<HashMap<String, RuntimeHandle>>,
}

/// A running conversation worker
struct RuntimeHandle {
    event_tx: mpsc::Sender<Envelope>,
    task: JoinHandle<()>,
}

impl<G, S> DialogManager<G, S>
where
    G: MessagingGateway + 'static,
    S: SessionStore + 'static,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>, config: DialogConfig) -> Self {
        Self {
            gateway,
            store,
            config,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Handle one inbound event and wait for its outcome
    #[allow(dead_code)] // The polling loop uses submit
    pub async fn handle(&self, conversation_id: &str, event: Event) -> Result<Outcome, DialogError> {
        let reply = self.submit(conversation_id, event).await?;
        reply
            .await
            .map_err(|_| DialogError::RuntimeUnavailable(conversation_id.to_string()))?
    }

    /// Queue an event for its conversation without waiting for the outcome.
    ///
    /// Events submitted sequentially for one conversation are handled in
    /// submission order. Never waits on a conversation's queue: when it is
    /// full the event is refused with [`DialogError::Busy`], so a slow
    /// conversation cannot hold up the others.
    pub async fn submit(
        &self,
        conversation_id: &str,
        event: Event,
    ) -> Result<OutcomeReceiver, DialogError> {
        let (reply, rx) = oneshot::channel();
        let mut envelope = Envelope { event, reply };

        // A runtime whose task died is replaced once
        for _ in 0..2 {
            let event_tx = self.get_or_create(conversation_id).await;
            match event_tx.try_send(envelope) {
                Ok(()) => return Ok(rx),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    return Err(DialogError::Busy(conversation_id.to_string()));
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => {
                    tracing::warn!(conv_id = %conversation_id, "Conversation runtime gone, restarting");
                    self.runtimes.write().await.remove(conversation_id);
                    envelope = returned;
                }
            }
        }

        Err(DialogError::RuntimeUnavailable(conversation_id.to_string()))
    }

    /// Get or create the runtime for a conversation
    async fn get_or_create(&self, conversation_id: &str) -> mpsc::Sender<Envelope> {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(conversation_id) {
                return handle.event_tx.clone();
            }
        }

        let mut runtimes = self.runtimes.write().await;
        // Another submitter may have won the race for the write lock
        if let Some(handle) = runtimes.get(conversation_id) {
            return handle.event_tx.clone();
        }

        let (event_tx, event_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let runtime = ConversationRuntime::new(
            conversation_id,
            self.gateway.clone(),
            self.store.clone(),
            event_rx,
        );

        // Start runtime in background
        let task = tokio::spawn(runtime.run());

        runtimes.insert(
            conversation_id.to_string(),
            RuntimeHandle {
                event_tx: event_tx.clone(),
                task,
            },
        );
        event_tx
    }

    /// Number of live conversation runtimes
    pub async fn runtime_count(&self) -> usize {
        self.runtimes.read().await.len()
    }

    /// Stop every conversation runtime once its queued events are handled.
    ///
    /// Runtimes still busy after `grace` are aborted. Returns how many
    /// finished on their own. Call after inbound delivery has stopped; a
    /// later `submit` starts a fresh runtime.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let handles: Vec<RuntimeHandle> = self.runtimes.write().await.drain().map(|(_, h)| h).collect();

        // Dropping the senders closes each queue behind the events already in it
        let mut tasks: Vec<JoinHandle<()>> = handles.into_iter().map(|h| h.task).collect();
        let total = tasks.len();

        let drained = tokio::time::timeout(grace, async {
            for task in &mut tasks {
                let _ = task.await;
            }
        })
        .await;

        if drained.is_ok() {
            return total;
        }

        let unfinished = tasks.iter().filter(|t| !t.is_finished()).count();
        tracing::warn!(unfinished, "Conversation runtimes still busy at shutdown, aborting");
        for task in &tasks {
            task.abort();
        }
        total - unfinished
    }
}
