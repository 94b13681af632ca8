//! Effects produced by state transitions

use super::state::AdvisorId;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a reply to the subscriber
    Send { text: String },

    /// Set `reservation_requested` on the record (never cleared)
    MarkReservationRequested,

    /// Ask the allocator for an advisor; the runtime answers with
    /// `Event::AdvisorAllocated`
    AllocateAdvisor,

    /// Forward a subscriber message to the assigned advisor
    NotifyAdvisor { advisor: AdvisorId, text: String },
}

impl Effect {
    pub fn send(text: impl Into<String>) -> Self {
        Effect::Send { text: text.into() }
    }

    pub fn notify_advisor(advisor: impl Into<AdvisorId>, text: impl Into<String>) -> Self {
        Effect::NotifyAdvisor {
            advisor: advisor.into(),
            text: text.into(),
        }
    }

    /// Outbound text, if this effect sends one
    #[allow(dead_code)] // Used in tests
    pub fn outbound_text(&self) -> Option<&str> {
        match self {
            Effect::Send { text } => Some(text),
            _ => None,
        }
    }
}
