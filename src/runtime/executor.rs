//! Conversation engine
//!
//! Drives one inbound event through load, transition, effects and persist
//! while holding that subscriber's lock. Effects run sequentially in emission
//! order; events they generate are fed back through the state machine before
//! the record is written.

use super::locks::SubscriberLocks;
use super::traits::{
    AdvisorAllocator, AdvisorNotifier, ConversationStore, MessageSender, StoreError,
};

use crate::db::ConversationRecord;
use crate::state_machine::messages::RESERVATION_REMINDER;
use crate::state_machine::{
    normalize_text, transition, ConvContext, ConvState, Effect, Event, StateKind,
};
use chrono::Utc;
use std::collections::VecDeque;

/// Channel prefix carried by WhatsApp addresses
const WHATSAPP_PREFIX: &str = "whatsapp:";

/// What happened to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// First contact, welcome sent
    Welcomed,
    /// Processed; the conversation is now in `state`
    Advanced { state: StateKind },
    /// Not processed and nothing was written
    Dropped { reason: String },
}

/// Counters from one reminder sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub eligible: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Generic engine that can work with any store, transport, allocator and notifier
pub struct ConversationEngine<S, M, A, N>
where
    S: ConversationStore,
    M: MessageSender,
    A: AdvisorAllocator,
    N: AdvisorNotifier,
{
    store: S,
    sender: M,
    allocator: A,
    notifier: N,
    locks: SubscriberLocks,
}

impl<S, M, A, N> ConversationEngine<S, M, A, N>
where
    S: ConversationStore,
    M: MessageSender,
    A: AdvisorAllocator,
    N: AdvisorNotifier,
{
    pub fn new(store: S, sender: M, allocator: A, notifier: N) -> Self {
        Self {
            store,
            sender,
            allocator,
            notifier,
            locks: SubscriberLocks::new(),
        }
    }

    /// Process one inbound message from `sender`.
    ///
    /// Only storage failures are returned; everything else is logged and
    /// reported through the outcome.
    pub async fn handle_inbound(
        &self,
        sender: &str,
        raw_text: &str,
    ) -> Result<InboundOutcome, StoreError> {
        let subscriber_id = normalize_subscriber(sender);
        if subscriber_id.is_empty() {
            tracing::warn!(sender = %sender, "Dropping message without a sender address");
            return Ok(InboundOutcome::Dropped {
                reason: "missing sender".to_string(),
            });
        }
        let text = normalize_text(raw_text);

        let _guard = self.locks.acquire(&subscriber_id).await;
        let now = Utc::now();

        let mut record = match self.store.get(&subscriber_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!(subscriber = %subscriber_id, "New subscriber");
                ConversationRecord::new(&subscriber_id, now)
            }
            Err(e @ StoreError::UnknownState { .. }) => {
                tracing::error!(subscriber = %subscriber_id, error = %e, "Dropping message for undecodable record");
                return Ok(InboundOutcome::Dropped {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let first_contact = record.state == ConvState::Inicio;
        record.last_contact_at = now;
        record.record_inbound(text.clone(), now);

        let context = ConvContext::new(&subscriber_id, now);
        if let Err(reason) = self
            .process_event(&mut record, &context, Event::inbound(text))
            .await
        {
            tracing::error!(
                subscriber = %subscriber_id,
                state = %record.state.kind(),
                error = %reason,
                "Dropping message"
            );
            return Ok(InboundOutcome::Dropped { reason });
        }

        self.store.put(&record).await?;

        if first_contact {
            Ok(InboundOutcome::Welcomed)
        } else {
            Ok(InboundOutcome::Advanced {
                state: record.state.kind(),
            })
        }
    }

    /// Send the confirmation reminder to every pending reservation.
    ///
    /// Works on a snapshot and never writes records, so it takes no
    /// subscriber locks.
    pub async fn run_reminder_sweep(&self) -> Result<SweepReport, StoreError> {
        let records = self.store.list_all().await?;
        let mut report = SweepReport {
            scanned: records.len(),
            ..SweepReport::default()
        };

        for record in records.iter().filter(|r| r.needs_reminder()) {
            report.eligible += 1;
            match self
                .sender
                .send(&record.subscriber_id, RESERVATION_REMINDER)
                .await
            {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(subscriber = %record.subscriber_id, error = %e, "Reminder not delivered");
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            eligible = report.eligible,
            sent = report.sent,
            failed = report.failed,
            "Reminder sweep finished"
        );
        Ok(report)
    }

    async fn process_event(
        &self,
        record: &mut ConversationRecord,
        context: &ConvContext,
        event: Event,
    ) -> Result<(), String> {
        // Queue rather than recursion so generated events keep emission order
        let mut events_to_process = VecDeque::from([event]);

        while let Some(current_event) = events_to_process.pop_front() {
            let result =
                transition(&record.state, context, current_event).map_err(|e| e.to_string())?;

            let old_kind = record.state.kind();
            record.state = result.new_state;
            if old_kind != record.state.kind() {
                tracing::info!(
                    subscriber = %record.subscriber_id,
                    from = %old_kind,
                    to = %record.state.kind(),
                    "State transition"
                );
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(record, effect).await {
                    events_to_process.push_back(generated_event);
                }
            }
        }

        Ok(())
    }

    async fn execute_effect(
        &self,
        record: &mut ConversationRecord,
        effect: Effect,
    ) -> Option<Event> {
        match effect {
            Effect::Send { text } => {
                if let Err(e) = self.sender.send(&record.subscriber_id, &text).await {
                    tracing::warn!(subscriber = %record.subscriber_id, error = %e, "Outbound message not delivered");
                }
                record.record_outbound(text, Utc::now());
                None
            }

            Effect::MarkReservationRequested => {
                if !record.reservation_requested {
                    tracing::info!(subscriber = %record.subscriber_id, "Reservation requested");
                }
                record.reservation_requested = true;
                None
            }

            Effect::AllocateAdvisor => {
                let advisor = self.allocator.allocate(&record.subscriber_id).await;
                match &advisor {
                    Some(a) => tracing::info!(subscriber = %record.subscriber_id, advisor = %a, "Advisor allocated"),
                    None => tracing::warn!(subscriber = %record.subscriber_id, "No advisor available"),
                }
                Some(Event::AdvisorAllocated { advisor })
            }

            Effect::NotifyAdvisor { advisor, text } => {
                if let Err(e) = self
                    .notifier
                    .notify(&record.subscriber_id, &advisor, &text)
                    .await
                {
                    tracing::warn!(
                        subscriber = %record.subscriber_id,
                        advisor = %advisor,
                        error = %e,
                        "Advisor notification failed"
                    );
                } else {
                    tracing::debug!(
                        subscriber = %record.subscriber_id,
                        advisor = %advisor,
                        collected = record.state.advisor_messages().len(),
                        "Advisor notified"
                    );
                }
                None
            }
        }
    }
}

/// Stable subscriber key from a channel address
pub fn normalize_subscriber(sender: &str) -> String {
    let trimmed = sender.trim();
    trimmed
        .strip_prefix(WHATSAPP_PREFIX)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
