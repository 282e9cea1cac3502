//! In-process session store

use super::traits::SessionStore;
use crate::dialog::Session;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Sessions kept in memory for the lifetime of the process.
///
/// The lock is held only for a single lookup, insert or removal, never
/// across a gateway call.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with a live session
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, conv_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(conv_id)
            .cloned()
    }

    fn create_or_reset(&self, conv_id: &str) -> Session {
        let session = Session::new();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conv_id.to_string(), session.clone());
        session
    }

    fn update<F>(&self, conv_id: &str, mutator: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get_mut(conv_id) {
            Some(session) => {
                mutator(session);
                true
            }
            None => false,
        }
    }

    fn clear(&self, conv_id: &str) -> Option<Session> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(conv_id)
    }
}
