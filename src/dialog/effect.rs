//! Effects produced by state transitions

use crate::gateway::{ButtonOption, Markup, MessageRef, PhotoRef, PhotoUpload};

/// Effects to be executed, in order, after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a text message
    SendText {
        text: String,
        markup: Option<Markup>,
    },

    /// Send a prompt with inline buttons
    SendButtons {
        prompt: String,
        options: Vec<ButtonOption>,
    },

    /// Acknowledge a button press
    AnswerSelection { selection_id: String },

    /// Rewrite the message that carried the pressed button
    EditMessage { message: MessageRef, text: String },

    /// Send a photo with a caption
    SendPhoto { photo: PhotoRef, caption: String },

    /// Ask the gateway to resolve an upload; yields `Event::PhotoResolved`
    ResolvePhoto { upload: PhotoUpload },

    /// Replace whatever is stored with a fresh session
    ResetSession,

    /// Store the transition's resulting session
    PersistSession,

    /// Drop the stored session
    ClearSession,
}

impl Effect {
    pub fn text(text: impl Into<String>) -> Self {
        Effect::SendText {
            text: text.into(),
            markup: None,
        }
    }

    pub fn text_with_markup(text: impl Into<String>, markup: Markup) -> Self {
        Effect::SendText {
            text: text.into(),
            markup: Some(markup),
        }
    }

    pub fn buttons(prompt: impl Into<String>, labels: &[&str]) -> Self {
        Effect::SendButtons {
            prompt: prompt.into(),
            options: labels.iter().map(|l| ButtonOption::plain(l)).collect(),
        }
    }

    pub fn answer(selection_id: &str) -> Self {
        Effect::AnswerSelection {
            selection_id: selection_id.to_string(),
        }
    }

    pub fn edit(message: &MessageRef, text: impl Into<String>) -> Self {
        Effect::EditMessage {
            message: message.clone(),
            text: text.into(),
        }
    }
}
