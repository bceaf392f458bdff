//! Command handler implementation.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{BotCommand, CommandResult, SetArgs};
use crate::answers::{AnswerRecord, AnswerStore};
use crate::config::{FormConfig, MAX_ANSWER_LENGTH, MIN_REPEAT_INTERVAL_MINS};
use crate::scheduler::{Recurrence, ScheduleConfig, ScheduleStore};

/// Handles bot commands and manages per-user state.
pub struct CommandHandler {
    /// Target form definition.
    form: Arc<FormConfig>,

    /// Saved answers.
    answers: Arc<RwLock<AnswerStore>>,

    /// Per-user schedules.
    schedules: Arc<RwLock<ScheduleStore>>,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        form: Arc<FormConfig>,
        answers: Arc<RwLock<AnswerStore>>,
        schedules: Arc<RwLock<ScheduleStore>>,
    ) -> Self {
        Self {
            form,
            answers,
            schedules,
        }
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `None` if the message is not a command.
    pub async fn try_handle(&self, user: i64, message_text: &str) -> Option<CommandResult> {
        let command = BotCommand::parse(message_text)?;

        debug!("Handling command from {}: {}", user, command);
        let result = self.execute(user, command).await;
        info!(
            "Command result for {}: success={}, trigger_submit={}",
            user, result.success, result.trigger_submit
        );

        Some(result)
    }

    /// Executes a parsed command.
    async fn execute(&self, user: i64, command: BotCommand) -> CommandResult {
        match command {
            BotCommand::Start => self.handle_start(),
            BotCommand::Help => Self::handle_help(),
            BotCommand::Fields => self.handle_fields(user).await,
            BotCommand::Answers => self.handle_answers(user).await,
            BotCommand::Set(args) => self.handle_set(user, args).await,
            BotCommand::Unset(field) => self.handle_unset(user, &field).await,
            BotCommand::Schedule { time, recurrence } => {
                self.handle_schedule(user, time, recurrence).await
            }
            BotCommand::Unschedule => self.handle_unschedule(user).await,
            BotCommand::Submit => self.handle_submit(user).await,
            BotCommand::Reset { confirmed } => self.handle_reset(user, confirmed).await,
            BotCommand::Status => self.handle_status(user).await,
            BotCommand::Info => Self::handle_info(),
        }
    }

    fn handle_start(&self) -> CommandResult {
        let required: Vec<&str> = self
            .form
            .required_fields()
            .map(|f| f.label.as_str())
            .collect();

        CommandResult::success(format!(
            "Hi! I auto-submit your answers to the configured form.\n\
             \n\
             1. Save an answer for each field: /set <field> <value>\n\
             2. Check completeness with /fields\n\
             3. Schedule submission: /schedule 09:30 daily\n\
             4. Or submit right away: /submit\n\
             \n\
             Required fields: {}\n\
             Use /help for the full command list.",
            required.join(", ")
        ))
    }

    fn handle_help() -> CommandResult {
        let mut lines = vec!["Form Bot Commands".to_owned(), String::new()];

        for (cmd, aliases, desc) in BotCommand::all_commands() {
            let alias_str = if aliases.is_empty() {
                String::new()
            } else {
                format!(" {aliases}")
            };
            lines.push(format!("  /{cmd}{alias_str} - {desc}"));
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_fields(&self, user: i64) -> CommandResult {
        let answers = self.answers.read().await;
        let record = answers.get(user);

        let mut lines = vec!["Form fields:".to_owned()];

        for field in &self.form.fields {
            let answered = record.and_then(|r| r.get(&field.key)).is_some();
            let marker = if answered { "✓" } else { "·" };
            let required = if field.required { " (required)" } else { "" };
            lines.push(format!("{marker} {}{required}", field.label));
        }

        lines.push(String::new());
        lines.push("Save an answer with /set <field> <value>.".to_owned());

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_answers(&self, user: i64) -> CommandResult {
        let answers = self.answers.read().await;

        let Some(record) = answers.get(user) else {
            return CommandResult::error(
                "No saved answers yet. Use /set <field> <value> to save one.",
            );
        };

        let mut lines = vec!["Your saved answers:".to_owned()];

        for field in &self.form.fields {
            if let Some(value) = record.get(&field.key) {
                lines.push(format!("  {}: {}", field.label, truncate(value, 40)));
            }
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_set(&self, user: i64, args: SetArgs) -> CommandResult {
        let Some(field) = self.form.field(&args.field) else {
            return CommandResult::error(format!(
                "Unknown field: '{}'. Use /fields to see the form's fields.",
                args.field
            ));
        };

        if let Err(e) = validate_answer_text(&args.value) {
            return CommandResult::error(e);
        }

        let mut answers = self.answers.write().await;

        let previous = answers
            .get(user)
            .and_then(|r| r.get(&field.key))
            .map(ToOwned::to_owned);
        answers.set(user, field.key.clone(), args.value.clone());

        if let Err(e) = answers.save() {
            // Rollback
            match previous {
                Some(value) => answers.set(user, field.key.clone(), value),
                None => {
                    answers.unset(user, &field.key);
                }
            }
            warn!("Failed to save answers: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        CommandResult::success(format!(
            "✓ Saved {}: \"{}\"",
            field.label,
            truncate(&args.value, 40)
        ))
    }

    async fn handle_unset(&self, user: i64, field_name: &str) -> CommandResult {
        let Some(field) = self.form.field(field_name) else {
            return CommandResult::error(format!(
                "Unknown field: '{field_name}'. Use /fields to see the form's fields."
            ));
        };

        let mut answers = self.answers.write().await;

        let previous = answers
            .get(user)
            .and_then(|r| r.get(&field.key))
            .map(ToOwned::to_owned);

        let Some(previous) = previous else {
            return CommandResult::error(format!("No saved answer for {}.", field.label));
        };

        answers.unset(user, &field.key);

        if let Err(e) = answers.save() {
            answers.set(user, field.key.clone(), previous); // Rollback
            warn!("Failed to save answers: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        CommandResult::success(format!("✓ Cleared answer for {}.", field.label))
    }

    async fn handle_schedule(
        &self,
        user: i64,
        time: Option<chrono::NaiveTime>,
        recurrence: Recurrence,
    ) -> CommandResult {
        if let Recurrence::Every { minutes } = recurrence
            && minutes < MIN_REPEAT_INTERVAL_MINS
        {
            return CommandResult::error(format!(
                "Repeating interval must be at least {MIN_REPEAT_INTERVAL_MINS} minutes."
            ));
        }

        let now = Local::now();
        let schedule = match (time, recurrence) {
            (Some(time), recurrence) => ScheduleConfig::at(time, recurrence, now),
            (None, Recurrence::Every { minutes }) => ScheduleConfig::every(minutes, now),
            (None, _) => {
                return CommandResult::error(
                    "Usage: /schedule <HH:MM> [daily|weekly|once] or /schedule every <minutes>",
                );
            }
        };

        let next = schedule
            .next_due()
            .map_or_else(|| "unknown".to_owned(), format_datetime);
        let recurrence = schedule.recurrence;

        let mut schedules = self.schedules.write().await;
        let previous = schedules.get(user).cloned();
        schedules.set(user, schedule);

        if let Err(e) = schedules.save() {
            // Rollback
            match previous {
                Some(schedule) => schedules.set(user, schedule),
                None => {
                    schedules.remove(user);
                }
            }
            warn!("Failed to save schedules: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        CommandResult::success(format!(
            "✓ Scheduled ({recurrence}). Next submission: {next}."
        ))
    }

    async fn handle_unschedule(&self, user: i64) -> CommandResult {
        let mut schedules = self.schedules.write().await;

        let Some(previous) = schedules.get(user).cloned() else {
            return CommandResult::error("No schedule set.");
        };

        schedules.remove(user);

        if let Err(e) = schedules.save() {
            schedules.set(user, previous); // Rollback
            warn!("Failed to save schedules: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        CommandResult::success("✓ Schedule removed.")
    }

    async fn handle_submit(&self, user: i64) -> CommandResult {
        let answers = self.answers.read().await;

        if answers.get(user).is_none() {
            return CommandResult::error(
                "No saved answers to submit. Use /set <field> <value> first.",
            );
        }

        CommandResult::success_with_submit("Submitting your answers…")
    }

    async fn handle_reset(&self, user: i64, confirmed: bool) -> CommandResult {
        if !confirmed {
            return CommandResult::error(
                "This deletes your saved answers and schedule. \
                 Type /reset confirm to proceed.",
            );
        }

        let mut answers = self.answers.write().await;
        let mut schedules = self.schedules.write().await;

        let had_answers = answers.reset(user);
        let had_schedule = schedules.remove(user);

        if !had_answers && !had_schedule {
            return CommandResult::error("Nothing to reset.");
        }

        if let Err(e) = answers.save() {
            warn!("Failed to save answers: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }
        if let Err(e) = schedules.save() {
            warn!("Failed to save schedules: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        CommandResult::success("✓ Your answers and schedule have been deleted.")
    }

    async fn handle_status(&self, user: i64) -> CommandResult {
        let answers = self.answers.read().await;
        let schedules = self.schedules.read().await;

        let record = answers.get(user);
        let required_total = self.form.required_fields().count();
        let required_answered = self
            .form
            .required_fields()
            .filter(|f| record.and_then(|r| r.get(&f.key)).is_some())
            .count();
        let saved_total = record.map_or(0, AnswerRecord::len);

        let schedule_info = schedules.get(user).map_or_else(
            || "none".to_owned(),
            |s| {
                let next = s
                    .next_due()
                    .map_or_else(|| "unknown".to_owned(), format_datetime);
                format!("{} (next: {next})", s.recurrence)
            },
        );

        CommandResult::success(format!(
            "Schedule: {schedule_info}\n\
             Answers: {saved_total} saved, {required_answered}/{required_total} required",
        ))
    }

    fn handle_info() -> CommandResult {
        let version = env!("CARGO_PKG_VERSION");
        CommandResult::success(format!(
            "Form Bot v{version}\n\
             A Telegram bot for scheduled Google Form auto-submission.\n\
             Repository: https://github.com/user/gform_bot"
        ))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

/// Validates answer text before saving.
///
/// Checks:
/// - Not empty
/// - Not longer than `MAX_ANSWER_LENGTH`
/// - No control characters except newlines and tabs
fn validate_answer_text(text: &str) -> Result<(), String> {
    if text.is_empty() {
        return Err("Answer text cannot be empty.".to_owned());
    }

    let char_count = text.chars().count();
    if char_count > MAX_ANSWER_LENGTH {
        return Err(format!(
            "Answer too long: {char_count} chars (max: {MAX_ANSWER_LENGTH})"
        ));
    }

    for ch in text.chars() {
        if ch.is_control() && ch != '\n' && ch != '\t' {
            return Err(format!(
                "Invalid character detected (code: U+{:04X}). Only text is allowed.",
                ch as u32
            ));
        }
    }

    Ok(())
}

/// Truncates a string to a maximum length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", chars[..max_len].iter().collect::<String>())
    }
}

/// Formats a local datetime for chat messages.
fn format_datetime(dt: chrono::DateTime<Local>) -> String {
    dt.format("%a %Y-%m-%d %H:%M").to_string()
}
