//! Events that drive the dialog

use crate::gateway::{MessageRef, PhotoRef, PhotoUpload};
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Commands
    Start,
    Skip,
    Cancel,

    // User input
    Text {
        text: String,
    },
    Selection {
        value: String,
        /// Acknowledged through the gateway once handled
        selection_id: String,
        /// Message carrying the pressed button, edited in place
        message: MessageRef,
    },
    Photo {
        upload: PhotoUpload,
    },

    // Runtime events
    /// The gateway resolved an accepted upload to a storable reference
    PhotoResolved {
        photo_ref: PhotoRef,
    },
}

/// Closed set of inbound event kinds the transition table is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StartCommand,
    TextMessage,
    ButtonSelection,
    PhotoUpload,
    SkipCommand,
    CancelCommand,
}

impl EventKind {
    #[cfg(test)]
    pub const ALL: [EventKind; 6] = [
        EventKind::StartCommand,
        EventKind::TextMessage,
        EventKind::ButtonSelection,
        EventKind::PhotoUpload,
        EventKind::SkipCommand,
        EventKind::CancelCommand,
    ];
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Start => EventKind::StartCommand,
            Event::Skip => EventKind::SkipCommand,
            Event::Cancel => EventKind::CancelCommand,
            Event::Text { .. } => EventKind::TextMessage,
            Event::Selection { .. } => EventKind::ButtonSelection,
            // A resolved photo continues the upload that produced it
            Event::Photo { .. } | Event::PhotoResolved { .. } => EventKind::PhotoUpload,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Event::Text { text: text.into() }
    }

    #[cfg(test)]
    pub fn selection(
        value: impl Into<String>,
        selection_id: impl Into<String>,
        message: MessageRef,
    ) -> Self {
        Event::Selection {
            value: value.into(),
            selection_id: selection_id.into(),
            message,
        }
    }
}
