//! Google Form Bot Library
//!
//! A Telegram bot that auto-submits a Google Form from saved answers.
//!
//! This crate provides the core functionality for:
//! - Describing the target form and validating its field set
//! - Persisting each user's saved answers and submission schedule
//! - Submitting the form over HTTP from the saved answers
//! - Handling user commands via chat messages

pub mod answers;
pub mod commands;
pub mod config;
pub mod scheduler;
pub mod submitter;
pub mod telegram;
