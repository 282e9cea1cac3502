//! Dialog state and per-conversation session types

use crate::gateway::PhotoRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored for optional answers the user chose not to give
pub const NOT_PROVIDED: &str = "Not provided";

// ============================================================================
// Dialog State
// ============================================================================

/// Stage of the listing dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    AwaitingCarType,
    AwaitingCarColor,
    AwaitingMileageDecision,
    AwaitingMileage,
    AwaitingPhoto,
    /// Terminal. Only a new start command leaves it.
    Completed,
}

impl DialogState {
    #[cfg(test)]
    pub const ALL: [DialogState; 6] = [
        DialogState::AwaitingCarType,
        DialogState::AwaitingCarColor,
        DialogState::AwaitingMileageDecision,
        DialogState::AwaitingMileage,
        DialogState::AwaitingPhoto,
        DialogState::Completed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, DialogState::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DialogState::AwaitingCarType => "awaiting_car_type",
            DialogState::AwaitingCarColor => "awaiting_car_color",
            DialogState::AwaitingMileageDecision => "awaiting_mileage_decision",
            DialogState::AwaitingMileage => "awaiting_mileage",
            DialogState::AwaitingPhoto => "awaiting_photo",
            DialogState::Completed => "completed",
        }
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Answer Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarType {
    Sedan,
    #[serde(rename = "SUV")]
    Suv,
    Sports,
    Electric,
}

impl CarType {
    pub const ALL: [CarType; 4] = [CarType::Sedan, CarType::Suv, CarType::Sports, CarType::Electric];

    pub fn label(self) -> &'static str {
        match self {
            CarType::Sedan => "Sedan",
            CarType::Suv => "SUV",
            CarType::Sports => "Sports",
            CarType::Electric => "Electric",
        }
    }

    /// Display glyph, used only when echoing the choice back
    pub fn glyph(self) -> &'static str {
        match self {
            CarType::Sedan => "🚗",
            CarType::Suv => "🚙",
            CarType::Sports => "🏎️",
            CarType::Electric => "⚡",
        }
    }

    /// Parse one of the keyboard labels. Surrounding whitespace is ignored,
    /// anything else must match exactly.
    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|t| t.label() == text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarColor {
    Red,
    Blue,
    Black,
    White,
}

impl CarColor {
    pub const ALL: [CarColor; 4] = [CarColor::Red, CarColor::Blue, CarColor::Black, CarColor::White];

    pub fn label(self) -> &'static str {
        match self {
            CarColor::Red => "Red",
            CarColor::Blue => "Blue",
            CarColor::Black => "Black",
            CarColor::White => "White",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == value)
    }
}

/// Answer to "would you like to fill in the mileage?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MileageDecision {
    Fill,
    Skip,
}

impl MileageDecision {
    pub const ALL: [MileageDecision; 2] = [MileageDecision::Fill, MileageDecision::Skip];

    pub fn label(self) -> &'static str {
        match self {
            MileageDecision::Fill => "Fill",
            MileageDecision::Skip => "Skip",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == value)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Everything collected so far for one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: DialogState,
    pub car_type: Option<CarType>,
    pub car_color: Option<CarColor>,
    /// Free-form text as typed, or [`NOT_PROVIDED`]
    pub mileage: Option<String>,
    pub photo_ref: Option<PhotoRef>,
}

impl Session {
    /// Fresh session right after a start command
    pub fn new() -> Self {
        Self {
            state: DialogState::AwaitingCarType,
            car_type: None,
            car_color: None,
            mileage: None,
            photo_ref: None,
        }
    }

    /// Stand-in for a conversation with no stored session
    pub fn completed() -> Self {
        Self {
            state: DialogState::Completed,
            ..Self::new()
        }
    }

    /// True when no field has been collected
    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        self.car_type.is_none()
            && self.car_color.is_none()
            && self.mileage.is_none()
            && self.photo_ref.is_none()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
