//! Events that can occur in a conversation

use super::state::AdvisorId;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Subscriber sent a message; `text` is already normalized
    Inbound { text: String },

    /// Result of an `AllocateAdvisor` effect
    AdvisorAllocated { advisor: Option<AdvisorId> },
}

impl Event {
    pub fn inbound(text: impl Into<String>) -> Self {
        Event::Inbound { text: text.into() }
    }
}
