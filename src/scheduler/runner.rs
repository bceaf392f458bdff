//! Submission scheduler runner.
//!
//! The scheduler loop is deliberately simple:
//! 1. On each tick, collect the users whose schedule is due, advancing
//!    each schedule as it is collected (an exact time match fires once).
//! 2. Submit for the collected users sequentially, one HTTP POST each.
//! 3. Report every outcome back to the user over chat.
//!
//! Failures are reported, never retried; the next fire time stands
//! regardless of the outcome. Manual `/submit` triggers arrive over the
//! control channel and take the same submission path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{RwLock, mpsc};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::answers::AnswerStore;
use crate::config::FormConfig;
use crate::scheduler::ScheduleStore;
use crate::submitter::{FormSubmitter, SubmitError};
use crate::telegram::Notifier;

/// Messages that can be sent to the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerMessage {
    /// Submit for one user now (manual `/submit`).
    TriggerSubmit(i64),
    /// Stop the scheduler.
    Shutdown,
}

/// Why a submission was started, for logs and chat reports.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    const fn describe(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled submission",
            Self::Manual => "Submission",
        }
    }
}

/// Fires form submissions when schedules come due.
pub struct SubmissionScheduler {
    /// Target form definition.
    form: Arc<FormConfig>,

    /// Saved answers.
    answers: Arc<RwLock<AnswerStore>>,

    /// Per-user schedules.
    schedules: Arc<RwLock<ScheduleStore>>,

    /// Form submitter.
    submitter: Arc<FormSubmitter>,

    /// Chat notifier for submission outcomes.
    notifier: Notifier,

    /// Interval between due-schedule checks.
    tick_interval: Duration,
}

impl SubmissionScheduler {
    /// Creates a new submission scheduler.
    #[must_use]
    pub fn new(
        form: Arc<FormConfig>,
        answers: Arc<RwLock<AnswerStore>>,
        schedules: Arc<RwLock<ScheduleStore>>,
        submitter: Arc<FormSubmitter>,
        notifier: Notifier,
    ) -> Self {
        Self {
            form,
            answers,
            schedules,
            submitter,
            notifier,
            tick_interval: Duration::from_secs(30),
        }
    }

    /// Sets the interval between due-schedule checks.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Runs the scheduler loop.
    pub async fn run(&self, mut rx: mpsc::Receiver<SchedulerMessage>) {
        info!("Submission scheduler started");

        let mut tick_timer = interval(self.tick_interval);

        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    self.tick().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(SchedulerMessage::TriggerSubmit(user)) => {
                            debug!("Received manual submit trigger for user {}", user);
                            self.submit_for(user, Trigger::Manual).await;
                        }
                        Some(SchedulerMessage::Shutdown) | None => {
                            info!("Scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Single tick of the scheduler.
    async fn tick(&self) {
        let now = Local::now();

        // Collect due users and advance their schedules under one write
        // lock, so each fire time is consumed exactly once.
        let due = {
            let mut schedules = self.schedules.write().await;
            let due = schedules.collect_due(now);

            if !due.is_empty()
                && let Err(e) = schedules.save()
            {
                warn!("Failed to save schedules: {}", e);
            }

            due
        };

        if due.is_empty() {
            return;
        }

        info!("{} user(s) due for submission", due.len());

        // One HTTP call per user per tick, sequential.
        for user in due {
            self.submit_for(user, Trigger::Scheduled).await;
        }
    }

    /// Submits for one user and reports the outcome over chat.
    async fn submit_for(&self, user: i64, trigger: Trigger) {
        // Clone the record out so no lock is held across the HTTP call.
        let record = {
            let answers = self.answers.read().await;
            answers.get(user).cloned()
        };

        let Some(record) = record else {
            warn!("User {} has no saved answers, skipping submission", user);
            self.notify(
                user,
                format!(
                    "✗ {} failed: no saved answers. Use /set to save them.",
                    trigger.describe()
                ),
            )
            .await;
            return;
        };

        match self.submitter.submit(&self.form, &record).await {
            Ok(result) => {
                info!(
                    "Submitted for user {} ({} answer(s), HTTP {})",
                    user,
                    record.len(),
                    result.status
                );
                self.notify(
                    user,
                    format!(
                        "✓ {} succeeded ({} answer(s) sent).",
                        trigger.describe(),
                        record.len()
                    ),
                )
                .await;
            }
            Err(e @ SubmitError::MissingAnswer { .. }) => {
                warn!("Submission for user {} rejected before send: {}", user, e);
                self.notify(user, format!("✗ {} failed: {e}", trigger.describe()))
                    .await;
            }
            Err(e) => {
                error!("Submission for user {} failed: {}", user, e);
                self.notify(user, format!("✗ {} failed: {e}", trigger.describe()))
                    .await;
            }
        }
    }

    async fn notify(&self, user: i64, text: String) {
        if let Err(e) = self.notifier.notify(user, &text).await {
            warn!("Failed to notify user {}: {}", user, e);
        }
    }
}

impl std::fmt::Debug for SubmissionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionScheduler")
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}
