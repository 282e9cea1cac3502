//! Pure state transition function
//!
//! Every step handler takes the current session and an inbound event and
//! returns the next session plus the ordered effects needed to get there.
//! No I/O happens here; the runtime executes the effects.

use super::state::{CarColor, CarType, DialogState, MileageDecision, Session, NOT_PROVIDED};
use super::summary::Summary;
use super::{Effect, Event, EventKind};
use crate::gateway::{Markup, MessageRef, PhotoRef};
use thiserror::Error;

const PHOTO_PROMPT: &str = "<b>Please upload a photo of your car 📷, or send /skip.</b>";
const COLOR_PROMPT: &str = "<b>Please choose:</b>";
const DECISION_PROMPT: &str = "<b>Choose an option:</b>";
const FAREWELL: &str = "Bye! Hope to talk to you again soon.";

/// Transitions registered for specific states, as `(from, event, to)`.
///
/// `StartCommand` and `CancelCommand` are accepted in every state and are
/// not listed here.
pub const TRANSITION_TABLE: &[(DialogState, EventKind, DialogState)] = &[
    (DialogState::AwaitingCarType, EventKind::TextMessage, DialogState::AwaitingCarColor),
    (DialogState::AwaitingCarColor, EventKind::ButtonSelection, DialogState::AwaitingMileageDecision),
    (DialogState::AwaitingMileageDecision, EventKind::ButtonSelection, DialogState::AwaitingMileage),
    (DialogState::AwaitingMileageDecision, EventKind::ButtonSelection, DialogState::AwaitingPhoto),
    (DialogState::AwaitingMileage, EventKind::TextMessage, DialogState::AwaitingPhoto),
    (DialogState::AwaitingPhoto, EventKind::PhotoUpload, DialogState::Completed),
    (DialogState::AwaitingPhoto, EventKind::SkipCommand, DialogState::Completed),
];

/// Whether `kind` has a handler registered for `state`
pub fn accepts(state: DialogState, kind: EventKind) -> bool {
    matches!(kind, EventKind::StartCommand | EventKind::CancelCommand)
        || TRANSITION_TABLE
            .iter()
            .any(|(from, k, _)| *from == state && *k == kind)
}

/// Whether moving `from` → `to` on `kind` is a registered transition
#[cfg(test)]
pub fn is_listed_transition(from: DialogState, kind: EventKind, to: DialogState) -> bool {
    match kind {
        EventKind::StartCommand => to == DialogState::AwaitingCarType,
        EventKind::CancelCommand => to == DialogState::Completed,
        _ => TRANSITION_TABLE.contains(&(from, kind, to)),
    }
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    /// Session as it should be stored once every effect has succeeded
    pub session: Session,
    pub effects: Vec<Effect>,
    /// Set when this step reached `Completed` through the summary
    pub summary: Option<Summary>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            effects: vec![],
            summary: None,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = Some(summary);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No transition from {state} on {kind:?}")]
    UnexpectedEvent { state: DialogState, kind: EventKind },
    #[error("{value:?} is not a valid answer in {state}")]
    MalformedSelection { state: DialogState, value: String },
}

/// Pure transition function
pub fn transition(session: &Session, event: &Event) -> Result<TransitionResult, TransitionError> {
    match (session.state, event) {
        // ============================================================
        // Any state
        // ============================================================
        (_, Event::Start) => Ok(start()),
        (_, Event::Cancel) => Ok(cancel()),

        // ============================================================
        // Car type (reply keyboard)
        // ============================================================
        (DialogState::AwaitingCarType, Event::Text { text }) => car_type(session, text),

        // ============================================================
        // Car color (inline buttons)
        // ============================================================
        (
            DialogState::AwaitingCarColor,
            Event::Selection {
                value,
                selection_id,
                message,
            },
        ) => car_color(session, value, selection_id, message),

        // ============================================================
        // Mileage: the only state with two successors
        // ============================================================
        (
            DialogState::AwaitingMileageDecision,
            Event::Selection {
                value,
                selection_id,
                message,
            },
        ) => mileage_decision(session, value, selection_id, message),

        (DialogState::AwaitingMileage, Event::Text { text }) => Ok(mileage(session, text)),

        // ============================================================
        // Photo
        // ============================================================

        // Resolution is I/O, so the runtime performs it and feeds the
        // reference back as PhotoResolved. Nothing is stored until then.
        (DialogState::AwaitingPhoto, Event::Photo { upload }) => {
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::ResolvePhoto {
                upload: upload.clone(),
            }))
        }

        (DialogState::AwaitingPhoto, Event::PhotoResolved { photo_ref }) => {
            Ok(photo(session, photo_ref))
        }

        (DialogState::AwaitingPhoto, Event::Skip) => Ok(skip_photo(session)),

        // ============================================================
        // Everything else is not dispatched
        // ============================================================
        (state, event) => Err(TransitionError::UnexpectedEvent {
            state,
            kind: event.kind(),
        }),
    }
}

/// Effects for an event that is not dispatched. A pressed button is still
/// acknowledged so the client stops waiting; nothing else happens.
pub fn dismiss(event: &Event) -> Vec<Effect> {
    match event {
        Event::Selection { selection_id, .. } => vec![Effect::answer(selection_id)],
        _ => vec![],
    }
}

/// Effects that ask again for the current state's answer after a malformed
/// one. The session is left as it is.
pub fn reprompt(state: DialogState, event: &Event) -> Vec<Effect> {
    let mut effects = dismiss(event);
    match state {
        DialogState::AwaitingCarType => effects.push(Effect::text_with_markup(
            "<b>Please pick one of the listed car types.</b>",
            car_type_keyboard(),
        )),
        DialogState::AwaitingCarColor => effects.push(color_buttons()),
        DialogState::AwaitingMileageDecision => effects.push(decision_buttons()),
        // Free-form or command-driven states never reject
        DialogState::AwaitingMileage | DialogState::AwaitingPhoto | DialogState::Completed => {}
    }
    effects
}

// ============================================================================
// Step handlers
// ============================================================================

fn start() -> TransitionResult {
    TransitionResult::new(Session::new())
        .with_effect(Effect::text_with_markup(
            "<b>Welcome to the Car Sales Listing Bot!\n\
             Let's get some details about the car you're selling.\n\
             What is your car type?</b>",
            car_type_keyboard(),
        ))
        .with_effect(Effect::ResetSession)
}

fn cancel() -> TransitionResult {
    TransitionResult::new(Session::completed())
        .with_effect(Effect::text_with_markup(FAREWELL, Markup::RemoveKeyboard))
        .with_effect(Effect::ClearSession)
}

fn car_type(session: &Session, text: &str) -> Result<TransitionResult, TransitionError> {
    let car_type = CarType::from_label(text).ok_or_else(|| TransitionError::MalformedSelection {
        state: session.state,
        value: text.to_string(),
    })?;

    let next = Session {
        state: DialogState::AwaitingCarColor,
        car_type: Some(car_type),
        ..session.clone()
    };

    Ok(TransitionResult::new(next)
        .with_effect(Effect::text_with_markup(
            format!(
                "<b>You selected {} car {}.\nWhat color your car is?</b>",
                car_type.label(),
                car_type.glyph()
            ),
            Markup::RemoveKeyboard,
        ))
        .with_effect(color_buttons())
        .with_effect(Effect::PersistSession))
}

fn car_color(
    session: &Session,
    value: &str,
    selection_id: &str,
    message: &MessageRef,
) -> Result<TransitionResult, TransitionError> {
    let color = CarColor::from_label(value).ok_or_else(|| TransitionError::MalformedSelection {
        state: session.state,
        value: value.to_string(),
    })?;

    let next = Session {
        state: DialogState::AwaitingMileageDecision,
        car_color: Some(color),
        ..session.clone()
    };

    Ok(TransitionResult::new(next)
        .with_effect(Effect::answer(selection_id))
        .with_effect(Effect::edit(
            message,
            format!(
                "<b>You selected {} color.\nWould you like to fill in the mileage for your car?</b>",
                color.label()
            ),
        ))
        .with_effect(decision_buttons())
        .with_effect(Effect::PersistSession))
}

fn mileage_decision(
    session: &Session,
    value: &str,
    selection_id: &str,
    message: &MessageRef,
) -> Result<TransitionResult, TransitionError> {
    let decision =
        MileageDecision::from_label(value).ok_or_else(|| TransitionError::MalformedSelection {
            state: session.state,
            value: value.to_string(),
        })?;

    let result = match decision {
        MileageDecision::Fill => TransitionResult::new(Session {
            state: DialogState::AwaitingMileage,
            ..session.clone()
        })
        .with_effect(Effect::answer(selection_id))
        .with_effect(Effect::edit(
            message,
            "<b>Please type in the mileage (e.g., 50000):</b>",
        )),

        MileageDecision::Skip => TransitionResult::new(Session {
            state: DialogState::AwaitingPhoto,
            mileage: Some(NOT_PROVIDED.to_string()),
            ..session.clone()
        })
        .with_effect(Effect::answer(selection_id))
        .with_effect(Effect::edit(message, "<b>Mileage step skipped.</b>"))
        .with_effect(Effect::text(PHOTO_PROMPT)),
    };

    Ok(result.with_effect(Effect::PersistSession))
}

/// Mileage is stored exactly as typed; no numeric validation
fn mileage(session: &Session, text: &str) -> TransitionResult {
    let next = Session {
        state: DialogState::AwaitingPhoto,
        mileage: Some(text.to_string()),
        ..session.clone()
    };

    TransitionResult::new(next)
        .with_effect(Effect::text(
            "<b>Mileage noted.\nPlease upload a photo of your car 📷, or send /skip.</b>",
        ))
        .with_effect(Effect::PersistSession)
}

fn photo(session: &Session, photo_ref: &PhotoRef) -> TransitionResult {
    let next = Session {
        state: DialogState::Completed,
        photo_ref: Some(photo_ref.clone()),
        ..session.clone()
    };
    complete(
        next,
        "<b>Photo uploaded successfully.\nLet's summarize your selections.</b>",
    )
}

fn skip_photo(session: &Session) -> TransitionResult {
    let next = Session {
        state: DialogState::Completed,
        ..session.clone()
    };
    complete(
        next,
        "<b>No photo uploaded.\nLet's summarize your selections.</b>",
    )
}

/// Entering `Completed` through the summary
fn complete(session: Session, confirmation: &str) -> TransitionResult {
    let summary = Summary::compile(&session);
    TransitionResult::new(session)
        .with_effects([
            Effect::text(confirmation),
            summary.clone().into_effect(),
            Effect::ClearSession,
        ])
        .with_summary(summary)
}

// ============================================================================
// Prompts
// ============================================================================

fn car_type_keyboard() -> Markup {
    Markup::ReplyKeyboard {
        options: CarType::ALL.iter().map(|t| t.label().to_string()).collect(),
        one_time: true,
    }
}

fn color_buttons() -> Effect {
    let labels: Vec<&str> = CarColor::ALL.iter().map(|c| c.label()).collect();
    Effect::buttons(COLOR_PROMPT, &labels)
}

fn decision_buttons() -> Effect {
    let labels: Vec<&str> = MileageDecision::ALL.iter().map(|d| d.label()).collect();
    Effect::buttons(DECISION_PROMPT, &labels)
}
