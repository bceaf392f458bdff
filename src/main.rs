//! Google Form Bot - Main Entry Point
//!
//! A Telegram bot that collects a user's preferred answers for a Google
//! Form once, stores them, and resubmits the same answers on a schedule
//! or on demand.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use gform_bot::answers::AnswerStore;
use gform_bot::commands::CommandHandler;
use gform_bot::config::{BotSettings, FormConfig, TelegramConfig};
use gform_bot::scheduler::{ScheduleStore, SchedulerMessage, SubmissionScheduler};
use gform_bot::submitter::FormSubmitter;
use gform_bot::telegram::Notifier;

/// Telegram bot for scheduled Google Form auto-submission.
#[derive(Parser, Debug)]
#[command(name = "gform_bot")]
#[command(about = "Auto-submit a Google Form from answers saved over Telegram")]
#[command(version)]
struct Args {
    /// Path to the form definition JSON file.
    #[arg(short, long, default_value = "form.json")]
    config: String,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Generate an example form definition file and exit.
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Handle example config generation
    if args.generate_config {
        return generate_example_config();
    }

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let settings = BotSettings::from_env_with_defaults();

    let form = FormConfig::load_from_file(&args.config)
        .context("Failed to load form definition")?;
    form.validate()
        .context("Form definition validation failed")?;

    info!(
        "Loaded form with {} field(s) ({} required), endpoint: {}",
        form.len(),
        form.required_fields().count(),
        form.response_url()
    );

    // Load persisted per-user state
    let answers =
        AnswerStore::load(&settings.answers_path).context("Failed to load saved answers")?;
    let mut schedules =
        ScheduleStore::load(&settings.schedules_path).context("Failed to load schedules")?;

    // Fire times missed while the process was down are not backfilled.
    let dropped = schedules.roll_forward_all(Local::now());
    if !dropped.is_empty() {
        info!(
            "Dropped {} expired one-shot schedule(s) missed while offline",
            dropped.len()
        );
        if let Err(e) = schedules.save() {
            warn!("Failed to save schedules: {}", e);
        }
    }

    info!(
        "Loaded {} user(s) with saved answers, {} schedule(s)",
        answers.len(),
        schedules.len()
    );

    let bot = Bot::new(&tg_config.bot_token);

    let form = Arc::new(form);
    let answers = Arc::new(RwLock::new(answers));
    let schedules = Arc::new(RwLock::new(schedules));
    let submitter = Arc::new(FormSubmitter::new(settings.min_submit_interval_secs));

    // Create scheduler channel
    let (scheduler_tx, scheduler_rx) = mpsc::channel::<SchedulerMessage>(32);

    // Create scheduler
    let scheduler = SubmissionScheduler::new(
        Arc::clone(&form),
        Arc::clone(&answers),
        Arc::clone(&schedules),
        Arc::clone(&submitter),
        Notifier::new(bot.clone()),
    )
    .with_tick_interval(Duration::from_secs(settings.tick_interval_secs));

    // Create command handler
    let cmd_handler = Arc::new(CommandHandler::new(
        Arc::clone(&form),
        Arc::clone(&answers),
        Arc::clone(&schedules),
    ));

    info!("Starting form bot...");

    // Spawn scheduler task
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_rx).await;
    });

    // Run the dispatcher until Ctrl+C
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![cmd_handler, scheduler_tx.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // Cleanup
    info!("Shutting down...");
    let _ = scheduler_tx.send(SchedulerMessage::Shutdown).await;
    let _ = scheduler_handle.await;

    Ok(())
}

/// Builds the update handler tree.
fn schema() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message().endpoint(handle_message)
}

/// Handles one inbound message.
async fn handle_message(
    bot: Bot,
    msg: Message,
    handler: Arc<CommandHandler>,
    scheduler_tx: mpsc::Sender<SchedulerMessage>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    match handler.try_handle(user_id, text).await {
        Some(result) => {
            let trigger_submit = result.trigger_submit;
            bot.send_message(msg.chat.id, result.message).await?;

            if trigger_submit
                && scheduler_tx
                    .send(SchedulerMessage::TriggerSubmit(user_id))
                    .await
                    .is_err()
            {
                warn!("Scheduler channel closed, manual submit dropped");
            }
        }
        None if text.trim_start().starts_with('/') => {
            bot.send_message(msg.chat.id, "Unrecognized command or arguments. Use /help.")
                .await?;
        }
        None => {
            debug!("Ignoring non-command message from {}", user_id);
        }
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Generates an example form definition file.
fn generate_example_config() -> Result<()> {
    let example = FormConfig::example();
    example.save_to_file("form.example.json")?;

    println!("✓ Example form definition written to: form.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy form.example.json to form.json");
    println!("2. Fill in your form's URL and entry keys");
    println!("   (entry keys are visible in the form page source, e.g. entry.123456789)");
    println!("3. Create a .env file with BOT_TOKEN");
    println!("4. Run: gform_bot");

    Ok(())
}
