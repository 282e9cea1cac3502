//! Property-based tests for the dialog state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::transition::is_listed_transition;
use super::*;
use crate::gateway::{MessageRef, PhotoRef, PhotoUpload, PhotoVariant};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Apply one event the way the runtime would: storage effects are applied
/// to the simulated store, and a resolve effect is answered immediately.
fn apply(session: &Session, event: &Event) -> Result<(Session, Vec<Effect>), TransitionError> {
    let result = transition(session, event)?;
    let mut effects = result.effects.clone();
    let mut next = result.session.clone();

    for effect in &result.effects {
        match effect {
            Effect::ResetSession => next = Session::new(),
            Effect::ClearSession => next = Session::completed(),
            Effect::ResolvePhoto { upload } => {
                let largest = upload.largest().map(|v| v.file_id.clone()).unwrap_or_default();
                let resolved = Event::PhotoResolved {
                    photo_ref: PhotoRef(largest),
                };
                let (after, more) = apply(session, &resolved)?;
                next = after;
                effects.extend(more);
            }
            _ => {}
        }
    }
    Ok((next, effects))
}

fn is_storage(effect: &Effect) -> bool {
    matches!(
        effect,
        Effect::ResetSession | Effect::PersistSession | Effect::ClearSession
    )
}

/// Which state owns each field
fn fields_written_outside_owner(before: &Session, after: &Session) -> Vec<&'static str> {
    let mut bad = vec![];
    if before.car_type != after.car_type && before.state != DialogState::AwaitingCarType {
        bad.push("car_type");
    }
    if before.car_color != after.car_color && before.state != DialogState::AwaitingCarColor {
        bad.push("car_color");
    }
    if before.mileage != after.mileage
        && !matches!(
            before.state,
            DialogState::AwaitingMileageDecision | DialogState::AwaitingMileage
        )
    {
        bad.push("mileage");
    }
    if before.photo_ref != after.photo_ref && before.state != DialogState::AwaitingPhoto {
        bad.push("photo_ref");
    }
    bad
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_message_ref() -> impl Strategy<Value = MessageRef> {
    (1i64..1000).prop_map(|id| MessageRef::new("chat-1", id))
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Sedan".to_string()),
        Just("SUV".to_string()),
        Just("Sports".to_string()),
        Just("Electric".to_string()),
        "[0-9]{1,7}",
        "[a-zA-Z ]{0,20}",
    ]
}

fn arb_selection_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Red".to_string()),
        Just("Blue".to_string()),
        Just("Black".to_string()),
        Just("White".to_string()),
        Just("Fill".to_string()),
        Just("Skip".to_string()),
        "[a-zA-Z]{0,10}",
    ]
}

fn arb_upload() -> impl Strategy<Value = PhotoUpload> {
    proptest::collection::vec(("[a-z]{6}", 1u32..2000, 1u32..2000), 1..4).prop_map(|sizes| {
        PhotoUpload::new(
            sizes
                .into_iter()
                .map(|(file_id, width, height)| PhotoVariant {
                    file_id,
                    width,
                    height,
                    file_size: None,
                })
                .collect(),
        )
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        1 => Just(Event::Start),
        1 => Just(Event::Skip),
        1 => Just(Event::Cancel),
        3 => arb_text().prop_map(|text| Event::Text { text }),
        3 => (arb_selection_value(), "[a-z0-9]{6}", arb_message_ref())
            .prop_map(|(value, id, message)| Event::selection(value, id, message)),
        1 => arb_upload().prop_map(|upload| Event::Photo { upload }),
    ]
}

fn arb_state() -> impl Strategy<Value = DialogState> {
    proptest::sample::select(DialogState::ALL.to_vec())
}

/// A session as it could look in the given state
fn arb_session() -> impl Strategy<Value = Session> {
    (
        arb_state(),
        proptest::option::of(proptest::sample::select(CarType::ALL.to_vec())),
        proptest::option::of(proptest::sample::select(CarColor::ALL.to_vec())),
        proptest::option::of("[0-9]{1,6}"),
        proptest::option::of("[a-z]{8}".prop_map(PhotoRef)),
    )
        .prop_map(|(state, car_type, car_color, mileage, photo_ref)| Session {
            state,
            car_type,
            car_color,
            mileage,
            photo_ref,
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: the state only moves along registered transitions
    #[test]
    fn prop_state_advances_only_via_table(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut session = Session::completed();

        for event in events {
            let kind = event.kind();
            match apply(&session, &event) {
                Ok((next, _)) => {
                    prop_assert!(
                        next.state == session.state
                            || is_listed_transition(session.state, kind, next.state),
                        "Unlisted move {} -> {} on {:?}",
                        session.state,
                        next.state,
                        kind
                    );
                    session = next;
                }
                Err(TransitionError::UnexpectedEvent { state, kind: rejected }) => {
                    prop_assert_eq!(state, session.state);
                    prop_assert!(!accepts(state, rejected));
                }
                Err(TransitionError::MalformedSelection { state, .. }) => {
                    prop_assert_eq!(state, session.state);
                }
            }
        }
    }

    // Invariant 2: a field is written only while its owning state is active
    #[test]
    fn prop_fields_written_only_by_owner(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut session = Session::completed();

        for event in events {
            let resets = matches!(event, Event::Start | Event::Cancel);
            if let Ok((next, _)) = apply(&session, &event) {
                if !resets && !next.state.is_terminal() {
                    let bad = fields_written_outside_owner(&session, &next);
                    prop_assert!(bad.is_empty(), "{:?} written in {}", bad, session.state);
                }
                session = next;
            }
        }
    }

    // Invariant 3: nothing is stored until every outbound effect is queued
    #[test]
    fn prop_storage_effects_come_last(session in arb_session(), event in arb_event()) {
        if let Ok(result) = transition(&session, &event) {
            let first_storage = result.effects.iter().position(is_storage);
            if let Some(idx) = first_storage {
                prop_assert!(
                    result.effects[idx..].iter().all(is_storage),
                    "Gateway effect after storage effect: {:?}",
                    result.effects
                );
            }
        }
    }

    // Invariant 4: cancel always completes and clears, whatever was collected
    #[test]
    fn prop_cancel_always_clears(session in arb_session()) {
        let (next, effects) = apply(&session, &Event::Cancel).unwrap();
        prop_assert_eq!(next.state, DialogState::Completed);
        prop_assert!(next.is_blank());
        prop_assert_eq!(effects.last(), Some(&Effect::ClearSession));
    }

    // Invariant 5: typed mileage is stored verbatim
    #[test]
    fn prop_mileage_stored_verbatim(text in ".*") {
        let session = Session { state: DialogState::AwaitingMileage, ..Session::new() };
        let result = transition(&session, &Event::Text { text: text.clone() }).unwrap();
        prop_assert_eq!(result.session.mileage, Some(text));
        prop_assert_eq!(result.session.state, DialogState::AwaitingPhoto);
    }

    // Invariant 6: anything outside the keyboard is rejected without a write
    #[test]
    fn prop_unknown_car_type_rejected(text in "[a-zA-Z0-9 ]{0,20}") {
        prop_assume!(CarType::from_label(&text).is_none());
        let session = Session::new();
        let result = transition(&session, &Event::Text { text });
        let is_malformed = matches!(result, Err(TransitionError::MalformedSelection { .. }));
        prop_assert!(is_malformed);
        prop_assert!(!reprompt(session.state, &Event::text("x")).is_empty());
    }

    // Invariant 7: completing always reports exactly four fields matching the session
    #[test]
    fn prop_summary_reflects_session(session in arb_session(), skip in any::<bool>()) {
        let session = Session { state: DialogState::AwaitingPhoto, ..session };
        let event = if skip {
            Event::Skip
        } else {
            Event::PhotoResolved { photo_ref: PhotoRef("resolved".to_string()) }
        };
        let result = transition(&session, &event).unwrap();
        let summary = result.summary.expect("completion carries a summary");

        prop_assert_eq!(summary.fields().len(), 4);
        prop_assert_eq!(summary.car_type, session.car_type);
        prop_assert_eq!(summary.car_color, session.car_color);
        prop_assert_eq!(&summary.mileage, &session.mileage);
        prop_assert_eq!(summary.photo.is_some(), !skip || session.photo_ref.is_some());
        let photo_sent = result.effects.iter().any(|e| matches!(e, Effect::SendPhoto { .. }));
        prop_assert_eq!(photo_sent, summary.photo.is_some());
    }
}

// ============================================================================
// Full dialogs
// ============================================================================

fn run(events: &[Event]) -> (Session, Vec<Effect>, Option<Summary>) {
    let mut session = Session::completed();
    let mut all_effects = vec![];
    let mut summary = None;
    for event in events {
        let result = transition(&session, event).unwrap();
        if result.summary.is_some() {
            summary.clone_from(&result.summary);
        }
        let (next, effects) = apply(&session, event).unwrap();
        session = next;
        all_effects.extend(effects);
    }
    (session, all_effects, summary)
}

#[test]
fn test_skip_everything_dialog() {
    let msg = MessageRef::new("chat-1", 7);
    let (session, _, summary) = run(&[
        Event::Start,
        Event::text("Sedan"),
        Event::selection("Red", "s1", msg.clone()),
        Event::selection("Skip", "s2", msg),
        Event::Skip,
    ]);

    assert_eq!(session, Session::completed());
    let summary = summary.unwrap();
    assert_eq!(
        summary.fields().map(|(_, v)| v),
        [
            "Sedan".to_string(),
            "Red".to_string(),
            NOT_PROVIDED.to_string(),
            NOT_PROVIDED.to_string(),
        ]
    );
}

#[test]
fn test_restart_mid_dialog_discards_answers() {
    let msg = MessageRef::new("chat-1", 7);
    let (session, _, _) = run(&[
        Event::Start,
        Event::text("Electric"),
        Event::selection("White", "s1", msg),
        Event::Start,
    ]);
    assert_eq!(session, Session::new());
}
