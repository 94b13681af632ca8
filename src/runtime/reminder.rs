//! Periodic reminder sweep
//!
//! Runs `run_reminder_sweep` on a fixed period until the token is cancelled.
//! A sweep that has already started is allowed to finish.

use super::executor::ConversationEngine;
use super::traits::{AdvisorAllocator, AdvisorNotifier, ConversationStore, MessageSender};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct ReminderScheduler<S, M, A, N>
where
    S: ConversationStore,
    M: MessageSender,
    A: AdvisorAllocator,
    N: AdvisorNotifier,
{
    engine: Arc<ConversationEngine<S, M, A, N>>,
    period: Duration,
    cancel: CancellationToken,
}

impl<S, M, A, N> ReminderScheduler<S, M, A, N>
where
    S: ConversationStore + 'static,
    M: MessageSender + 'static,
    A: AdvisorAllocator + 'static,
    N: AdvisorNotifier + 'static,
{
    pub fn new(
        engine: Arc<ConversationEngine<S, M, A, N>>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            period,
            cancel,
        }
    }

    /// Start the loop on the runtime; the first sweep happens one period in
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::info!(period_secs = self.period.as_secs(), "Reminder scheduler started");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.engine.run_reminder_sweep().await {
                        tracing::error!(error = %e, "Reminder sweep failed");
                    }
                }
            }
        }

        tracing::info!("Reminder scheduler stopped");
    }
}
