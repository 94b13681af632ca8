//! Runtime for executing conversations
//!
//! The engine owns the I/O side of the state machine: it loads records,
//! executes effects and persists results. Collaborators sit behind the
//! traits in [`traits`] so tests can swap them for in-memory mocks.

mod executor;
mod locks;
mod reminder;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ConversationEngine, InboundOutcome, SweepReport};
pub use reminder::ReminderScheduler;
pub use traits::*;

/// Type alias for the production engine with concrete implementations
pub type ProductionEngine = ConversationEngine<
    DatabaseStore,
    std::sync::Arc<dyn MessageSender>,
    PoolAllocator,
    std::sync::Arc<dyn AdvisorNotifier>,
>;
