//! Keyed lock table serializing work per subscriber

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = HashMap<String, Arc<Mutex<()>>>;

/// One async mutex per subscriber id, created on first use and removed once
/// nobody holds or waits for it.
///
/// Holding a subscriber's guard never blocks work on another subscriber.
#[derive(Default)]
pub struct SubscriberLocks {
    locks: Arc<StdMutex<LockTable>>,
}

/// Exclusive access to one subscriber until dropped
pub struct SubscriberGuard {
    guard: Option<OwnedMutexGuard<()>>,
    subscriber_id: String,
    locks: Arc<StdMutex<LockTable>>,
}

impl SubscriberLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one subscriber
    pub async fn acquire(&self, subscriber_id: &str) -> SubscriberGuard {
        let lock = {
            let mut locks = table(&self.locks);
            locks
                .entry(subscriber_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        SubscriberGuard {
            guard: Some(lock.lock_owned().await),
            subscriber_id: subscriber_id.to_string(),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        table(&self.locks).len()
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        // Release first so the table holds the only other reference when idle
        drop(self.guard.take());

        let mut locks = table(&self.locks);
        if locks
            .get(&self.subscriber_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.subscriber_id);
        }
    }
}

/// The table is only touched in short synchronous sections, so a poisoned
/// lock still holds a consistent map.
fn table(locks: &StdMutex<LockTable>) -> StdMutexGuard<'_, LockTable> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}
