//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a human advisor (an email address in the default pool)
pub type AdvisorId = String;

/// A message left by the subscriber for their advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorMessage {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

// ============================================================================
// Conversation State
// ============================================================================

/// Conversation state
///
/// Persisted as tagged JSON (`{"type":"PRECIOS"}`). The advisor session only
/// exists inside the `Asesor` variant, so advisor messages cannot outlive
/// the hand-off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvState {
    /// Record just created, welcome not yet sent
    #[default]
    Inicio,

    /// Waiting for a menu option 1-5
    MenuPrincipal,

    /// Showed the jump types
    TiposSalto,

    /// Showed the requirements, may ask for a reservation
    Requisitos,

    /// Showed the prices, may ask for a reservation
    Precios,

    /// Showed the location
    Ubicacion,

    /// Handed off to a human advisor
    Asesor {
        advisor: AdvisorId,
        #[serde(default)]
        messages: Vec<AdvisorMessage>,
    },

    /// Reserved terminal state; nothing transitions here yet
    Fin,
}

impl ConvState {
    /// Fieldless discriminant, used for history entries and logging
    pub fn kind(&self) -> StateKind {
        match self {
            ConvState::Inicio => StateKind::Inicio,
            ConvState::MenuPrincipal => StateKind::MenuPrincipal,
            ConvState::TiposSalto => StateKind::TiposSalto,
            ConvState::Requisitos => StateKind::Requisitos,
            ConvState::Precios => StateKind::Precios,
            ConvState::Ubicacion => StateKind::Ubicacion,
            ConvState::Asesor { .. } => StateKind::Asesor,
            ConvState::Fin => StateKind::Fin,
        }
    }

    /// Check if this is one of the four informational states
    pub fn is_info(&self) -> bool {
        matches!(
            self,
            ConvState::TiposSalto | ConvState::Requisitos | ConvState::Precios | ConvState::Ubicacion
        )
    }

    /// Check if an affirmative answer here requests a reservation
    pub fn offers_reservation(&self) -> bool {
        matches!(self, ConvState::Requisitos | ConvState::Precios)
    }

    /// Messages collected for the advisor, empty outside the hand-off
    pub fn advisor_messages(&self) -> &[AdvisorMessage] {
        match self {
            ConvState::Asesor { messages, .. } => messages,
            _ => &[],
        }
    }
}

/// State label without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateKind {
    Inicio,
    MenuPrincipal,
    TiposSalto,
    Requisitos,
    Precios,
    Ubicacion,
    Asesor,
    Fin,
}

impl StateKind {
    pub const ALL: [StateKind; 8] = [
        StateKind::Inicio,
        StateKind::MenuPrincipal,
        StateKind::TiposSalto,
        StateKind::Requisitos,
        StateKind::Precios,
        StateKind::Ubicacion,
        StateKind::Asesor,
        StateKind::Fin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateKind::Inicio => "INICIO",
            StateKind::MenuPrincipal => "MENU_PRINCIPAL",
            StateKind::TiposSalto => "TIPOS_SALTO",
            StateKind::Requisitos => "REQUISITOS",
            StateKind::Precios => "PRECIOS",
            StateKind::Ubicacion => "UBICACION",
            StateKind::Asesor => "ASESOR",
            StateKind::Fin => "FIN",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown state label: {s}"))
    }
}

/// Context for a single transition (immutable inputs besides the state)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub subscriber_id: String,
    /// Clock reading taken by the runtime before the transition
    pub now: DateTime<Utc>,
}

impl ConvContext {
    pub fn new(subscriber_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            now,
        }
    }
}
