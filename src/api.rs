//! HTTP ingress for the messaging channel

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::{
    AdvisorAllocator, AdvisorNotifier, ConversationEngine, ConversationStore, InboundOutcome,
    MessageSender, StoreError,
};
use async_trait::async_trait;
use std::sync::Arc;

/// What the webhook needs from the engine
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle_inbound(&self, from: &str, text: &str) -> Result<InboundOutcome, StoreError>;
}

#[async_trait]
impl<S, M, A, N> InboundHandler for ConversationEngine<S, M, A, N>
where
    S: ConversationStore,
    M: MessageSender,
    A: AdvisorAllocator,
    N: AdvisorNotifier,
{
    async fn handle_inbound(&self, from: &str, text: &str) -> Result<InboundOutcome, StoreError> {
        ConversationEngine::handle_inbound(self, from, text).await
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn InboundHandler>,
}

impl AppState {
    pub fn new(engine: Arc<dyn InboundHandler>) -> Self {
        Self { engine }
    }
}
