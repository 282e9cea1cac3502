//! Listing dialog state machine
//!
//! Pure transitions in the Elm Architecture style: `transition` maps a
//! session and an event to the next session plus the effects the runtime
//! must carry out.

mod effect;
pub mod event;
pub mod state;
mod summary;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, EventKind};
pub use state::{CarColor, CarType, DialogState, Session, NOT_PROVIDED};
pub use summary::Summary;
pub use transition::{accepts, dismiss, reprompt, transition, TransitionError, TransitionResult};
