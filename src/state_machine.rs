//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! every inbound message becomes an [`Event`], [`transition`] maps it to a
//! new [`ConvState`] plus the [`Effect`]s the runtime must carry out.

pub mod classify;
mod effect;
pub mod event;
pub mod messages;
pub mod state;
pub(crate) mod transition;


pub use classify::{classify_reply, is_decline, normalize_text, Reply};
pub use effect::Effect;
pub use event::Event;
pub use state::{AdvisorId, AdvisorMessage, ConvContext, ConvState, StateKind};
pub use transition::{transition, TransitionError, TransitionResult};
