//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine with mock implementations.

use crate::db::{ConversationRecord, Database, DbError};
use crate::state_machine::AdvisorId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a conversation store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A persisted state no longer decodes into a known state
    #[error("Unknown state for {subscriber_id}: {raw}")]
    UnknownState { subscriber_id: String, raw: String },
    #[error("Storage failure: {0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::UnknownState { subscriber_id, raw } => {
                StoreError::UnknownState { subscriber_id, raw }
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Outbound delivery failure
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Transport rejected message: {0}")]
    Rejected(String),
    #[error("Transport unreachable: {0}")]
    Network(String),
}

/// Advisor notification failure
#[derive(Debug, Error)]
#[error("Advisor notification failed: {0}")]
pub struct NotifyError(pub String);

/// Durable mapping from subscriber id to conversation record
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, subscriber_id: &str) -> Result<Option<ConversationRecord>, StoreError>;

    /// Insert or replace the record; history is append-only
    async fn put(&self, record: &ConversationRecord) -> Result<(), StoreError>;

    /// Snapshot of every readable record
    async fn list_all(&self) -> Result<Vec<ConversationRecord>, StoreError>;
}

/// Outbound message transport
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), SendError>;
}

/// Picks an advisor for a hand-off
#[async_trait]
pub trait AdvisorAllocator: Send + Sync {
    async fn allocate(&self, subscriber_id: &str) -> Option<AdvisorId>;
}

/// Forwards subscriber messages to the assigned advisor
#[async_trait]
pub trait AdvisorNotifier: Send + Sync {
    async fn notify(
        &self,
        subscriber_id: &str,
        advisor: &AdvisorId,
        text: &str,
    ) -> Result<(), NotifyError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn get(&self, subscriber_id: &str) -> Result<Option<ConversationRecord>, StoreError> {
        (**self).get(subscriber_id).await
    }

    async fn put(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        (**self).put(record).await
    }

    async fn list_all(&self) -> Result<Vec<ConversationRecord>, StoreError> {
        (**self).list_all().await
    }
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), SendError> {
        (**self).send(subscriber_id, text).await
    }
}

#[async_trait]
impl<T: AdvisorAllocator + ?Sized> AdvisorAllocator for Arc<T> {
    async fn allocate(&self, subscriber_id: &str) -> Option<AdvisorId> {
        (**self).allocate(subscriber_id).await
    }
}

#[async_trait]
impl<T: AdvisorNotifier + ?Sized> AdvisorNotifier for Arc<T> {
    async fn notify(
        &self,
        subscriber_id: &str,
        advisor: &AdvisorId,
        text: &str,
    ) -> Result<(), NotifyError> {
        (**self).notify(subscriber_id, advisor, text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a ConversationStore
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for DatabaseStore {
    async fn get(&self, subscriber_id: &str) -> Result<Option<ConversationRecord>, StoreError> {
        Ok(self.db.get_record(subscriber_id)?)
    }

    async fn put(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        Ok(self.db.put_record(record)?)
    }

    async fn list_all(&self) -> Result<Vec<ConversationRecord>, StoreError> {
        Ok(self.db.list_records()?)
    }
}

/// Default allocation policy: always the first advisor in the pool
#[derive(Debug, Clone, Default)]
pub struct PoolAllocator {
    pool: Vec<AdvisorId>,
}

impl PoolAllocator {
    pub fn new(pool: Vec<AdvisorId>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdvisorAllocator for PoolAllocator {
    async fn allocate(&self, _subscriber_id: &str) -> Option<AdvisorId> {
        self.pool.first().cloned()
    }
}
