//! Trait abstractions for runtime storage
//!
//! The executor is generic over its session store so tests can inspect it
//! directly.

use crate::dialog::Session;
use std::sync::Arc;

/// Per-conversation session storage.
///
/// Implementations must be safe to share between conversation tasks; every
/// call touches exactly one conversation id.
pub trait SessionStore: Send + Sync {
    /// Current session, if the conversation has one
    fn get(&self, conv_id: &str) -> Option<Session>;

    /// Store a fresh session, replacing any existing one
    fn create_or_reset(&self, conv_id: &str) -> Session;

    /// Mutate the stored session in place. Returns false when there is none.
    fn update<F>(&self, conv_id: &str, mutator: F) -> bool
    where
        F: FnOnce(&mut Session);

    /// Remove the session, returning what was stored
    fn clear(&self, conv_id: &str) -> Option<Session>;
}

// ============================================================================
// Arc implementation
// ============================================================================

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self, conv_id: &str) -> Option<Session> {
        (**self).get(conv_id)
    }

    fn create_or_reset(&self, conv_id: &str) -> Session {
        (**self).create_or_reset(conv_id)
    }

    fn update<F>(&self, conv_id: &str, mutator: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        (**self).update(conv_id, mutator)
    }

    fn clear(&self, conv_id: &str) -> Option<Session> {
        (**self).clear(conv_id)
    }
}
