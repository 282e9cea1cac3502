//! Content types exchanged with the messaging gateway

use serde::{Deserialize, Serialize};

/// Reference to a message the gateway has delivered, used for later edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub conversation_id: String,
    pub message_id: i64,
}

impl MessageRef {
    pub fn new(conversation_id: impl Into<String>, message_id: i64) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id,
        }
    }
}

/// Stable, cheap-to-store handle to an uploaded photo.
///
/// The bytes stay with the gateway; only the identifier travels through
/// the dialog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoRef(pub String);

impl PhotoRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One resolution of an uploaded photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl PhotoVariant {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A photo upload as received from the remote party, in every resolution
/// the network produced for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub variants: Vec<PhotoVariant>,
}

impl PhotoUpload {
    pub fn new(variants: Vec<PhotoVariant>) -> Self {
        Self { variants }
    }

    /// Highest-resolution variant. Ties go to the later entry, which is
    /// where networks put the original.
    pub fn largest(&self) -> Option<&PhotoVariant> {
        self.variants
            .iter()
            .enumerate()
            .max_by_key(|(idx, v)| (v.area(), v.file_size.unwrap_or(0), *idx))
            .map(|(_, v)| v)
    }
}

/// Inline button shown under a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonOption {
    pub label: String,
    pub value: String,
}

impl ButtonOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Button whose callback value equals its label
    pub fn plain(label: &str) -> Self {
        Self::new(label, label)
    }
}

/// Keyboard markup attached to a text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Markup {
    /// Reply keyboard offering fixed answers, laid out on one row
    ReplyKeyboard { options: Vec<String>, one_time: bool },
    /// Remove any reply keyboard currently shown
    RemoveKeyboard,
}
