//! Database schema and types

pub use crate::state_machine::state::ConvState;
use crate::state_machine::StateKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    subscriber_id TEXT PRIMARY KEY,
    state TEXT NOT NULL DEFAULT '{"type":"INICIO"}',
    reservation_requested BOOLEAN NOT NULL DEFAULT 0,
    reservation_confirmed BOOLEAN,
    first_contact_at TEXT NOT NULL,
    last_contact_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_reservation
    ON conversations(reservation_requested, reservation_confirmed);

CREATE TABLE IF NOT EXISTS history (
    subscriber_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    direction TEXT NOT NULL,
    text TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (subscriber_id, sequence_id),
    FOREIGN KEY (subscriber_id) REFERENCES conversations(subscriber_id)
);
"#;

/// Direction of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

/// One line of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub text: String,
    /// State the conversation was in when the entry was recorded
    pub state: StateKind,
}

/// Conversation record, one per subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub subscriber_id: String,
    pub first_contact_at: DateTime<Utc>,
    pub last_contact_at: DateTime<Utc>,
    pub state: ConvState,
    /// Set once the subscriber asks to book; never reset
    pub reservation_requested: bool,
    /// Written by an external confirmation flow; `None` means still pending
    pub reservation_confirmed: Option<bool>,
    /// Append-only audit trail
    pub history: Vec<HistoryEntry>,
}

impl ConversationRecord {
    /// Fresh record for a first contact
    pub fn new(subscriber_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            first_contact_at: now,
            last_contact_at: now,
            state: ConvState::Inicio,
            reservation_requested: false,
            reservation_confirmed: None,
            history: vec![],
        }
    }

    /// Whether the reminder sweep should nudge this subscriber
    pub fn needs_reminder(&self) -> bool {
        self.reservation_requested && self.reservation_confirmed.is_none()
    }

    pub fn record_inbound(&mut self, text: impl Into<String>, at: DateTime<Utc>) {
        self.push_history(Direction::Inbound, text.into(), at);
    }

    pub fn record_outbound(&mut self, text: impl Into<String>, at: DateTime<Utc>) {
        self.push_history(Direction::Outbound, text.into(), at);
    }

    fn push_history(&mut self, direction: Direction, text: String, at: DateTime<Utc>) {
        self.history.push(HistoryEntry {
            timestamp: at,
            direction,
            text,
            state: self.state.kind(),
        });
    }
}
