//! Submission scheduling module.
//!
//! Manages per-user submission schedules and fires the form submitter
//! when a schedule comes due.

mod runner;
mod state;

pub use runner::{SchedulerMessage, SubmissionScheduler};
pub use state::{Recurrence, ScheduleConfig, ScheduleStore};
