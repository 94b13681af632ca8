//! Mock implementations for testing
//!
//! These mocks enable integration testing of the engine without real I/O.

use super::executor::ConversationEngine;
use super::traits::*;
use crate::db::ConversationRecord;
use crate::state_machine::AdvisorId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory store following the database's write rules: history is
/// append-only, `reservation_requested` never resets and a stored
/// `reservation_confirmed` is never cleared.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, ConversationRecord>>,
    /// Ids whose persisted state pretends not to decode
    corrupt: Mutex<HashSet<String>>,
    fail_puts: AtomicBool,
    fail_reads: AtomicBool,
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the engine
    pub fn insert(&self, record: ConversationRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.subscriber_id.clone(), record);
    }

    pub fn record(&self, subscriber_id: &str) -> Option<ConversationRecord> {
        self.records.lock().unwrap().get(subscriber_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn mark_corrupt(&self, subscriber_id: &str) {
        self.corrupt
            .lock()
            .unwrap()
            .insert(subscriber_id.to_string());
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get(&self, subscriber_id: &str) -> Result<Option<ConversationRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read failed".to_string()));
        }
        if self.corrupt.lock().unwrap().contains(subscriber_id) {
            return Err(StoreError::UnknownState {
                subscriber_id: subscriber_id.to_string(),
                raw: r#"{"type":"RESERVA"}"#.to_string(),
            });
        }
        Ok(self.record(subscriber_id))
    }

    async fn put(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let mut merged = record.clone();
        if let Some(stored) = records.get(&record.subscriber_id) {
            if record.history.len() < stored.history.len() {
                return Err(StoreError::Backend("history truncated".to_string()));
            }
            merged.first_contact_at = stored.first_contact_at;
            merged.reservation_requested |= stored.reservation_requested;
            merged.reservation_confirmed = record
                .reservation_confirmed
                .or(stored.reservation_confirmed);
        }
        records.insert(merged.subscriber_id.clone(), merged);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ConversationRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read failed".to_string()));
        }
        let corrupt = self.corrupt.lock().unwrap();
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| !corrupt.contains(&r.subscriber_id))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Recording Sender
// ============================================================================

/// Sender that records every attempt, optionally failing all of them
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            failing: AtomicBool::new(true),
        }
    }

    /// All attempts as (subscriber, text), in order
    pub fn attempts(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts attempted for one subscriber
    pub fn texts_for(&self, subscriber_id: &str) -> Vec<String> {
        self.attempts()
            .into_iter()
            .filter(|(to, _)| to == subscriber_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), SendError> {
        self.sent
            .lock()
            .unwrap()
            .push((subscriber_id.to_string(), text.to_string()));
        // Give other tasks a chance to interleave
        tokio::task::yield_now().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(SendError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Recording Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<(String, AdvisorId, String)>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            notifications: Mutex::new(vec![]),
            failing: AtomicBool::new(true),
        }
    }

    pub fn notifications(&self) -> Vec<(String, AdvisorId, String)> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdvisorNotifier for RecordingNotifier {
    async fn notify(
        &self,
        subscriber_id: &str,
        advisor: &AdvisorId,
        text: &str,
    ) -> Result<(), NotifyError> {
        self.notifications.lock().unwrap().push((
            subscriber_id.to_string(),
            advisor.clone(),
            text.to_string(),
        ));
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError("workflow endpoint returned 503".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Test Engine
// ============================================================================

pub type MockEngine = ConversationEngine<
    Arc<InMemoryStore>,
    Arc<RecordingSender>,
    PoolAllocator,
    Arc<RecordingNotifier>,
>;

/// Engine plus handles on its mocks
pub struct TestEngine {
    pub engine: Arc<MockEngine>,
    pub store: Arc<InMemoryStore>,
    pub sender: Arc<RecordingSender>,
    pub notifier: Arc<RecordingNotifier>,
}

pub struct TestEngineBuilder {
    pool: Vec<AdvisorId>,
    sender: RecordingSender,
    notifier: RecordingNotifier,
    store: InMemoryStore,
}

#[allow(dead_code)]
impl TestEngineBuilder {
    pub fn new() -> Self {
        Self {
            pool: vec![],
            sender: RecordingSender::new(),
            notifier: RecordingNotifier::new(),
            store: InMemoryStore::new(),
        }
    }

    pub fn advisors(mut self, pool: &[&str]) -> Self {
        self.pool = pool.iter().map(ToString::to_string).collect();
        self
    }

    pub fn sender(mut self, sender: RecordingSender) -> Self {
        self.sender = sender;
        self
    }

    pub fn notifier(mut self, notifier: RecordingNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(mut self, store: InMemoryStore) -> Self {
        self.store = store;
        self
    }

    pub fn build(self) -> TestEngine {
        let store = Arc::new(self.store);
        let sender = Arc::new(self.sender);
        let notifier = Arc::new(self.notifier);
        let engine = Arc::new(ConversationEngine::new(
            store.clone(),
            sender.clone(),
            PoolAllocator::new(self.pool),
            notifier.clone(),
        ));
        TestEngine {
            engine,
            store,
            sender,
            notifier,
        }
    }
}

impl Default for TestEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEngine {
    pub fn builder() -> TestEngineBuilder {
        TestEngineBuilder::new()
    }

    /// Feed a sequence of messages from one sender, asserting none fail
    pub async fn converse(&self, from: &str, texts: &[&str]) -> Vec<super::InboundOutcome> {
        let mut outcomes = vec![];
        for text in texts {
            outcomes.push(self.engine.handle_inbound(from, text).await.unwrap());
        }
        outcomes
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Direction;
    use crate::runtime::{InboundOutcome, ReminderScheduler, SweepReport};
    use crate::state_machine::messages;
    use crate::state_machine::{ConvState, StateKind};
    use chrono::Utc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const SUBSCRIBER: &str = "+5215550001111";
    const FROM: &str = "whatsapp:+5215550001111";

    /// End to end: ask for prices, accept, get reminded
    #[tokio::test]
    async fn test_pricing_reservation_flow() {
        let t = TestEngine::builder().build();

        let outcomes = t.converse(FROM, &["Hola", "3", "Sí"]).await;
        assert_eq!(
            outcomes,
            vec![
                InboundOutcome::Welcomed,
                InboundOutcome::Advanced {
                    state: StateKind::Precios
                },
                InboundOutcome::Advanced {
                    state: StateKind::Precios
                },
            ]
        );
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER),
            vec![
                messages::WELCOME,
                messages::PRICES,
                messages::RESERVATION_DETAILS
            ]
        );

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert!(record.reservation_requested);
        assert_eq!(record.reservation_confirmed, None);
        assert_eq!(record.state, ConvState::Precios);

        // Booking details are free text and fall through to the menu
        let outcomes = t.converse(FROM, &["Juan Pérez, 20 de julio"]).await;
        assert_eq!(
            outcomes,
            vec![InboundOutcome::Advanced {
                state: StateKind::MenuPrincipal
            }]
        );
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER).last(),
            Some(&messages::anything_else())
        );
        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.state, ConvState::MenuPrincipal);
        assert!(record.reservation_requested);
        assert_eq!(record.history.len(), 8);
        assert_eq!(record.history[6].text, "juan pérez, 20 de julio");
        assert_eq!(record.history[6].state, StateKind::Precios);

        t.sender.clear();
        let report = t.engine.run_reminder_sweep().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                scanned: 1,
                eligible: 1,
                sent: 1,
                failed: 0
            }
        );
        assert_eq!(
            t.sender.attempts(),
            vec![(SUBSCRIBER.to_string(), messages::RESERVATION_REMINDER.to_string())]
        );
    }

    #[tokio::test]
    async fn test_store_keeps_reservation_flags() {
        let store = InMemoryStore::new();
        let mut record = ConversationRecord::new(SUBSCRIBER, Utc::now());
        record.reservation_requested = true;
        record.reservation_confirmed = Some(true);
        store.put(&record).await.unwrap();

        record.reservation_requested = false;
        record.reservation_confirmed = None;
        store.put(&record).await.unwrap();

        let stored = store.record(SUBSCRIBER).unwrap();
        assert!(stored.reservation_requested);
        assert_eq!(stored.reservation_confirmed, Some(true));

        record.history.clear();
        record.record_inbound("hola", Utc::now());
        store.put(&record).await.unwrap();
        record.history.clear();
        assert!(matches!(
            store.put(&record).await,
            Err(StoreError::Backend(_))
        ));
    }

    /// Confirmation written by another process survives later messages
    #[tokio::test]
    async fn test_external_confirmation_survives_conversation() {
        let t = TestEngine::builder().build();
        t.converse(FROM, &["hola", "3", "sí"]).await;

        let mut confirmed = t.store.record(SUBSCRIBER).unwrap();
        confirmed.reservation_confirmed = Some(true);
        t.store.insert(confirmed);

        t.converse(FROM, &["no", "4"]).await;

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert!(record.reservation_requested);
        assert_eq!(record.reservation_confirmed, Some(true));
        assert_eq!(t.engine.run_reminder_sweep().await.unwrap().eligible, 0);
    }

    /// End to end: ask for an advisor with nobody on shift
    #[tokio::test]
    async fn test_empty_advisor_pool_flow() {
        let t = TestEngine::builder().build();

        let outcomes = t.converse(FROM, &["hola", "5"]).await;
        assert_eq!(
            outcomes[1],
            InboundOutcome::Advanced {
                state: StateKind::MenuPrincipal
            }
        );
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER),
            vec![messages::WELCOME, messages::NO_ADVISORS]
        );

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.state, ConvState::MenuPrincipal);
        assert!(t.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_advisor_hand_off_and_return() {
        let t = TestEngine::builder()
            .advisors(&["asesor1@empresa.com", "asesor2@empresa.com"])
            .build();

        t.converse(FROM, &["hola", "5"]).await;
        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(
            record.state,
            ConvState::Asesor {
                advisor: "asesor1@empresa.com".to_string(),
                messages: vec![],
            }
        );
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER)[1],
            messages::advisor_assigned("asesor1@empresa.com")
        );

        t.converse(FROM, &["Quiero un salto tándem"]).await;
        assert_eq!(
            t.notifier.notifications(),
            vec![(
                SUBSCRIBER.to_string(),
                "asesor1@empresa.com".to_string(),
                "quiero un salto tándem".to_string()
            )]
        );
        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.state.advisor_messages().len(), 1);
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER).last().map(String::as_str),
            Some(messages::ADVISOR_ACK)
        );

        let outcomes = t.converse(FROM, &["no, gracias"]).await;
        assert_eq!(
            outcomes[0],
            InboundOutcome::Advanced {
                state: StateKind::MenuPrincipal
            }
        );
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER).last(),
            Some(&messages::advisor_goodbye())
        );
        assert!(t.store.record(SUBSCRIBER).unwrap().state.advisor_messages().is_empty());
    }

    #[tokio::test]
    async fn test_history_has_two_entries_per_message() {
        let t = TestEngine::builder().advisors(&["asesor1@empresa.com"]).build();
        let texts = ["hola", "7", "1", "no", "2", "si", "nombre y fecha", "5", "ayuda", "nop"];

        t.converse(FROM, &texts).await;

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.history.len(), 2 * texts.len());
        for pair in record.history.chunks(2) {
            assert_eq!(pair[0].direction, Direction::Inbound);
            assert_eq!(pair[1].direction, Direction::Outbound);
        }
        // Inbound entries carry the state before the transition
        assert_eq!(record.history[0].state, StateKind::Inicio);
        assert_eq!(record.history[1].state, StateKind::MenuPrincipal);
        assert_eq!(record.history[4].state, StateKind::MenuPrincipal);
        assert_eq!(record.history[5].state, StateKind::TiposSalto);
    }

    #[tokio::test]
    async fn test_inputs_are_normalized() {
        let t = TestEngine::builder().build();

        t.converse("  whatsapp:+5215550001111 ", &["  HOLA  ", " 2 "]).await;

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.state, ConvState::Requisitos);
        assert_eq!(record.history[0].text, "hola");
        assert_eq!(record.history[2].text, "2");
    }

    #[tokio::test]
    async fn test_missing_sender_is_dropped() {
        let t = TestEngine::builder().build();

        let outcome = t.engine.handle_inbound("whatsapp:", "hola").await.unwrap();
        assert!(matches!(outcome, InboundOutcome::Dropped { .. }));
        assert_eq!(t.store.len(), 0);
        assert!(t.sender.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_reservation_flag_never_resets() {
        let t = TestEngine::builder().build();

        t.converse(FROM, &["hola", "2", "sí", "no", "1", "no"]).await;

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.state, ConvState::MenuPrincipal);
        assert!(record.reservation_requested);
    }

    #[tokio::test]
    async fn test_affirmative_outside_booking_states_does_not_reserve() {
        let t = TestEngine::builder().build();

        t.converse(FROM, &["hola", "4", "sí"]).await;

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert!(!record.reservation_requested);
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER).last().map(String::as_str),
            Some(messages::MORE_INFO)
        );
    }

    #[tokio::test]
    async fn test_reminder_only_for_pending_reservations() {
        let t = TestEngine::builder().build();
        let now = Utc::now();

        let mut pending = ConversationRecord::new("pending", now);
        pending.reservation_requested = true;
        let mut confirmed = ConversationRecord::new("confirmed", now);
        confirmed.reservation_requested = true;
        confirmed.reservation_confirmed = Some(true);
        let mut declined = ConversationRecord::new("declined", now);
        declined.reservation_requested = true;
        declined.reservation_confirmed = Some(false);
        let browsing = ConversationRecord::new("browsing", now);

        for record in [pending.clone(), confirmed, declined, browsing] {
            t.store.insert(record);
        }

        let report = t.engine.run_reminder_sweep().await.unwrap();
        assert_eq!(report.scanned, 4);
        assert_eq!(report.eligible, 1);
        assert_eq!(
            t.sender.attempts(),
            vec![("pending".to_string(), messages::RESERVATION_REMINDER.to_string())]
        );

        // Sweeping never writes
        assert_eq!(t.store.record("pending").unwrap(), pending);
    }

    #[tokio::test]
    async fn test_reminder_send_failures_are_counted() {
        let t = TestEngine::builder()
            .sender(RecordingSender::failing())
            .build();
        let mut record = ConversationRecord::new(SUBSCRIBER, Utc::now());
        record.reservation_requested = true;
        t.store.insert(record);

        let report = t.engine.run_reminder_sweep().await.unwrap();
        assert_eq!(report.eligible, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_reminder_sweep_surfaces_store_errors() {
        let t = TestEngine::builder().build();
        t.store.fail_reads(true);

        let result = t.engine.run_reminder_sweep().await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    /// Concurrent messages from one subscriber are serialized
    #[tokio::test]
    async fn test_concurrent_messages_same_subscriber() {
        let t = TestEngine::builder().build();
        let n = 20;

        let tasks = (0..n).map(|i| {
            let engine = t.engine.clone();
            tokio::spawn(async move { engine.handle_inbound(FROM, &format!("msg {i}")).await })
        });
        let results = futures::future::join_all(tasks).await;

        let welcomed = results
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .filter(|o| *o == InboundOutcome::Welcomed)
            .count();
        assert_eq!(welcomed, 1);

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.history.len(), 2 * n);
        assert_eq!(record.state, ConvState::MenuPrincipal);
        let welcomes = t
            .sender
            .texts_for(SUBSCRIBER)
            .into_iter()
            .filter(|text| text == messages::WELCOME)
            .count();
        assert_eq!(welcomes, 1);
    }

    #[tokio::test]
    async fn test_concurrent_subscribers_are_independent() {
        let t = TestEngine::builder().build();

        let tasks = (0..10).map(|i| {
            let engine = t.engine.clone();
            tokio::spawn(async move {
                let from = format!("whatsapp:+52155500000{i:02}");
                engine.handle_inbound(&from, "hola").await?;
                engine.handle_inbound(&from, "3").await
            })
        });
        for result in futures::future::join_all(tasks).await {
            assert_eq!(
                result.unwrap().unwrap(),
                InboundOutcome::Advanced {
                    state: StateKind::Precios
                }
            );
        }
        assert_eq!(t.store.len(), 10);
    }

    #[tokio::test]
    async fn test_send_failure_still_persists() {
        let t = TestEngine::builder()
            .sender(RecordingSender::failing())
            .build();

        let outcome = t.engine.handle_inbound(FROM, "hola").await.unwrap();
        assert_eq!(outcome, InboundOutcome::Welcomed);

        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.state, ConvState::MenuPrincipal);
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history[1].text, messages::WELCOME);
    }

    #[tokio::test]
    async fn test_notify_failure_still_acknowledges() {
        let t = TestEngine::builder()
            .advisors(&["asesor1@empresa.com"])
            .notifier(RecordingNotifier::failing())
            .build();

        t.converse(FROM, &["hola", "5", "tengo una duda"]).await;

        assert_eq!(t.notifier.notifications().len(), 1);
        assert_eq!(
            t.sender.texts_for(SUBSCRIBER).last().map(String::as_str),
            Some(messages::ADVISOR_ACK)
        );
        let record = t.store.record(SUBSCRIBER).unwrap();
        assert_eq!(record.state.advisor_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let t = TestEngine::builder().build();
        t.store.fail_puts(true);

        let result = t.engine.handle_inbound(FROM, "hola").await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(t.store.record(SUBSCRIBER).is_none());
    }

    #[tokio::test]
    async fn test_unknown_state_is_dropped_without_writing() {
        let t = TestEngine::builder().build();
        t.converse(FROM, &["hola"]).await;
        t.store.mark_corrupt(SUBSCRIBER);
        t.sender.clear();

        let outcome = t.engine.handle_inbound(FROM, "1").await.unwrap();
        assert!(matches!(outcome, InboundOutcome::Dropped { .. }));
        assert!(t.sender.attempts().is_empty());
        assert_eq!(t.store.record(SUBSCRIBER).unwrap().history.len(), 2);
    }

    #[tokio::test]
    async fn test_terminal_state_is_dropped_without_writing() {
        let t = TestEngine::builder().build();
        let mut record = ConversationRecord::new(SUBSCRIBER, Utc::now());
        record.state = ConvState::Fin;
        t.store.insert(record.clone());

        let outcome = t.engine.handle_inbound(FROM, "hola").await.unwrap();
        assert!(matches!(outcome, InboundOutcome::Dropped { .. }));
        assert!(t.sender.attempts().is_empty());
        assert_eq!(t.store.record(SUBSCRIBER).unwrap(), record);
    }

    #[tokio::test]
    async fn test_scheduler_sweeps_until_cancelled() {
        let t = TestEngine::builder().build();
        let mut record = ConversationRecord::new(SUBSCRIBER, Utc::now());
        record.reservation_requested = true;
        t.store.insert(record);

        let cancel = CancellationToken::new();
        let handle =
            ReminderScheduler::new(t.engine.clone(), Duration::from_millis(20), cancel.clone())
                .spawn();

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop after cancel")
            .unwrap();

        let reminders = t.sender.texts_for(SUBSCRIBER).len();
        assert!(reminders >= 1, "expected at least one sweep");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(t.sender.texts_for(SUBSCRIBER).len(), reminders);
    }
}
