//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! result and performs no I/O. Advisor allocation is the one step that needs
//! outside information, so it is split in two: the menu emits
//! `Effect::AllocateAdvisor` and the runtime answers with
//! `Event::AdvisorAllocated`.

use super::classify::{classify_reply, is_decline, Reply};
use super::messages;
use super::state::{AdvisorMessage, ConvContext, ConvState};
use super::{Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Outbound texts in emission order
    #[allow(dead_code)] // Used in tests
    pub fn outbound_messages(&self) -> Vec<&str> {
        self.effects.iter().filter_map(Effect::outbound_text).collect()
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Conversation is in terminal state FIN")]
    Terminal,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (ConvState::Fin, _) => Err(TransitionError::Terminal),

        // First contact: whatever was said, answer with the welcome menu
        (ConvState::Inicio, Event::Inbound { .. }) => Ok(TransitionResult::new(
            ConvState::MenuPrincipal,
        )
        .with_effect(Effect::send(messages::WELCOME))),

        (ConvState::MenuPrincipal, Event::Inbound { text }) => Ok(select_menu_option(&text)),

        (ConvState::MenuPrincipal, Event::AdvisorAllocated { advisor: Some(advisor) }) => {
            let reply = messages::advisor_assigned(&advisor);
            Ok(TransitionResult::new(ConvState::Asesor {
                advisor,
                messages: vec![],
            })
            .with_effect(Effect::send(reply)))
        }

        // Empty pool: the hand-off never starts, stay on the menu
        (ConvState::MenuPrincipal, Event::AdvisorAllocated { advisor: None }) => {
            Ok(TransitionResult::new(ConvState::MenuPrincipal)
                .with_effect(Effect::send(messages::NO_ADVISORS)))
        }

        (info, Event::Inbound { text }) if info.is_info() => Ok(answer_info(info, &text)),

        (ConvState::Asesor { .. }, Event::Inbound { text }) if is_decline(&text) => {
            Ok(TransitionResult::new(ConvState::MenuPrincipal)
                .with_effect(Effect::send(messages::advisor_goodbye())))
        }

        (ConvState::Asesor { advisor, messages: collected }, Event::Inbound { text }) => {
            let mut collected = collected.clone();
            collected.push(AdvisorMessage {
                timestamp: context.now,
                text: text.clone(),
            });

            Ok(TransitionResult::new(ConvState::Asesor {
                advisor: advisor.clone(),
                messages: collected,
            })
            .with_effect(Effect::notify_advisor(advisor.clone(), text))
            .with_effect(Effect::send(messages::ADVISOR_ACK)))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {:?} for {}",
            state.kind(),
            event,
            context.subscriber_id
        ))),
    }
}

fn select_menu_option(text: &str) -> TransitionResult {
    let (next, reply) = match text {
        "1" => (ConvState::TiposSalto, messages::JUMP_TYPES),
        "2" => (ConvState::Requisitos, messages::REQUIREMENTS),
        "3" => (ConvState::Precios, messages::PRICES),
        "4" => (ConvState::Ubicacion, messages::LOCATION),
        "5" => {
            return TransitionResult::new(ConvState::MenuPrincipal)
                .with_effect(Effect::AllocateAdvisor);
        }
        _ => {
            return TransitionResult::new(ConvState::MenuPrincipal)
                .with_effect(Effect::send(messages::INVALID_OPTION));
        }
    };

    TransitionResult::new(next).with_effect(Effect::send(reply))
}

fn answer_info(state: &ConvState, text: &str) -> TransitionResult {
    match classify_reply(text) {
        // Reservation details are accepted as free text on later turns
        Reply::Affirmative if state.offers_reservation() => {
            TransitionResult::new(state.clone())
                .with_effect(Effect::MarkReservationRequested)
                .with_effect(Effect::send(messages::RESERVATION_DETAILS))
        }
        Reply::Affirmative => {
            TransitionResult::new(state.clone()).with_effect(Effect::send(messages::MORE_INFO))
        }
        Reply::Other => TransitionResult::new(ConvState::MenuPrincipal)
            .with_effect(Effect::send(messages::anything_else())),
    }
}
