//! Command types and definitions.

use std::fmt;

use chrono::NaiveTime;

use crate::scheduler::Recurrence;

/// Arguments for saving one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetArgs {
    pub field: String,
    pub value: String,
}

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Welcome message and setup instructions.
    Start,

    /// Show help information.
    Help,

    /// List the form's fields and which have saved answers.
    Fields,

    /// Show the saved answers.
    Answers,

    /// Save an answer for one field.
    Set(SetArgs),

    /// Clear the saved answer for one field.
    Unset(String),

    /// Create or replace the submission schedule.
    Schedule {
        time: Option<NaiveTime>,
        recurrence: Recurrence,
    },

    /// Remove the submission schedule.
    Unschedule,

    /// Submit the form now.
    Submit,

    /// Destroy saved answers and schedule.
    Reset { confirmed: bool },

    /// Show the current schedule and answer completeness.
    Status,

    /// Show information about the bot.
    Info,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the message is not a valid command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        let after_slash = text.strip_prefix('/')?;

        // Handle commands with arguments
        let (cmd, args) = match after_slash.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, Some(args.trim())),
            None => (after_slash, None),
        };

        // Group chats suffix the addressee: /status@some_bot
        let cmd = cmd.split('@').next().unwrap_or(cmd).to_lowercase();

        match cmd.as_str() {
            "start" => Some(Self::Start),
            "help" | "h" | "?" => Some(Self::Help),
            "fields" | "form" => Some(Self::Fields),
            "answers" | "list" | "ls" => Some(Self::Answers),
            "set" | "save" => Self::parse_set(args?),
            "unset" | "clear" => args
                .filter(|a| !a.is_empty())
                .map(|a| Self::Unset(a.to_owned())),
            "schedule" => Self::parse_schedule(args?),
            "unschedule" | "stop" => Some(Self::Unschedule),
            "submit" | "now" => Some(Self::Submit),
            "reset" => Some(Self::Reset {
                confirmed: args.is_some_and(|a| a.eq_ignore_ascii_case("confirm")),
            }),
            "status" | "stat" | "s" => Some(Self::Status),
            "info" | "about" | "version" => Some(Self::Info),
            _ => None,
        }
    }

    /// Parses set command arguments: `<field> <value>`
    fn parse_set(args: &str) -> Option<Self> {
        let (field, value) = args.split_once(char::is_whitespace)?;
        let field = field.to_owned();
        let value = value.trim().to_owned();

        if field.is_empty() || value.is_empty() {
            return None;
        }

        Some(Self::Set(SetArgs { field, value }))
    }

    /// Parses schedule command arguments:
    /// `<HH:MM> [daily|weekly|once]` or `every <minutes>`
    fn parse_schedule(args: &str) -> Option<Self> {
        let mut parts = args.split_whitespace();
        let first = parts.next()?;

        if first.eq_ignore_ascii_case("every") {
            let minutes = parts.next()?.parse().ok()?;
            if parts.next().is_some() {
                return None;
            }
            return Some(Self::Schedule {
                time: None,
                recurrence: Recurrence::Every { minutes },
            });
        }

        let time = NaiveTime::parse_from_str(first, "%H:%M").ok()?;

        let recurrence = match parts.next() {
            None => Recurrence::Daily,
            Some(word) => match word.to_lowercase().as_str() {
                "daily" => Recurrence::Daily,
                "weekly" => Recurrence::Weekly,
                "once" => Recurrence::Once,
                _ => return None,
            },
        };

        if parts.next().is_some() {
            return None;
        }

        Some(Self::Schedule {
            time: Some(time),
            recurrence,
        })
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Fields => "fields",
            Self::Answers => "answers",
            Self::Set(_) => "set",
            Self::Unset(_) => "unset",
            Self::Schedule { .. } => "schedule",
            Self::Unschedule => "unschedule",
            Self::Submit => "submit",
            Self::Reset { .. } => "reset",
            Self::Status => "status",
            Self::Info => "info",
        }
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("start", "", "Welcome message and setup instructions"),
            ("fields", "(form)", "List form fields and answer state"),
            ("answers", "(ls)", "Show your saved answers"),
            ("set <field> <value>", "", "Save an answer for a field"),
            ("unset <field>", "(clear)", "Clear one saved answer"),
            (
                "schedule <HH:MM> [daily|weekly|once]",
                "",
                "Schedule automatic submission",
            ),
            (
                "schedule every <minutes>",
                "",
                "Schedule on a repeating interval",
            ),
            ("unschedule", "(stop)", "Remove the schedule"),
            ("submit", "(now)", "Submit the form right away"),
            ("status", "(s)", "Show schedule and answer completeness"),
            ("reset confirm", "", "Delete your answers and schedule"),
            ("info", "", "Show bot information"),
            ("help", "(h, ?)", "Show this help message"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(args) => write!(f, "set {} {}", args.field, args.value),
            Self::Unset(field) => write!(f, "unset {field}"),
            Self::Schedule {
                time: Some(time),
                recurrence,
            } => write!(f, "schedule {} {recurrence}", time.format("%H:%M")),
            Self::Schedule {
                time: None,
                recurrence,
            } => write!(f, "schedule {recurrence}"),
            Self::Reset { confirmed } => {
                write!(f, "reset{}", if *confirmed { " confirm" } else { "" })
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,

    /// Whether to trigger an immediate form submission.
    pub trigger_submit: bool,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            trigger_submit: false,
        }
    }

    /// Creates a successful result that triggers a submission.
    #[must_use]
    pub fn success_with_submit(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            trigger_submit: true,
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            trigger_submit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
    }

    #[test]
    fn test_parse_help_aliases() {
        assert_eq!(BotCommand::parse("/help"), Some(BotCommand::Help));
        assert_eq!(BotCommand::parse("/h"), Some(BotCommand::Help));
        assert_eq!(BotCommand::parse("/?"), Some(BotCommand::Help));
    }

    #[test]
    fn test_parse_set() {
        assert_eq!(
            BotCommand::parse("/set temperature 36.5"),
            Some(BotCommand::Set(SetArgs {
                field: "temperature".to_owned(),
                value: "36.5".to_owned(),
            }))
        );
    }

    #[test]
    fn test_parse_set_value_keeps_spaces() {
        assert_eq!(
            BotCommand::parse("/set remarks feeling fine today"),
            Some(BotCommand::Set(SetArgs {
                field: "remarks".to_owned(),
                value: "feeling fine today".to_owned(),
            }))
        );
    }

    #[test]
    fn test_parse_set_without_value() {
        assert_eq!(BotCommand::parse("/set temperature"), None);
        assert_eq!(BotCommand::parse("/set"), None);
    }

    #[test]
    fn test_parse_unset() {
        assert_eq!(
            BotCommand::parse("/unset temperature"),
            Some(BotCommand::Unset("temperature".to_owned()))
        );
        assert_eq!(BotCommand::parse("/unset"), None);
    }

    #[test]
    fn test_parse_schedule_default_daily() {
        assert_eq!(
            BotCommand::parse("/schedule 09:30"),
            Some(BotCommand::Schedule {
                time: Some(hm(9, 30)),
                recurrence: Recurrence::Daily,
            })
        );
    }

    #[test]
    fn test_parse_schedule_weekly() {
        assert_eq!(
            BotCommand::parse("/schedule 21:00 weekly"),
            Some(BotCommand::Schedule {
                time: Some(hm(21, 0)),
                recurrence: Recurrence::Weekly,
            })
        );
    }

    #[test]
    fn test_parse_schedule_every() {
        assert_eq!(
            BotCommand::parse("/schedule every 45"),
            Some(BotCommand::Schedule {
                time: None,
                recurrence: Recurrence::Every { minutes: 45 },
            })
        );
    }

    #[test]
    fn test_parse_schedule_invalid() {
        assert_eq!(BotCommand::parse("/schedule"), None);
        assert_eq!(BotCommand::parse("/schedule 9am"), None);
        assert_eq!(BotCommand::parse("/schedule 09:30 sometimes"), None);
        assert_eq!(BotCommand::parse("/schedule every soon"), None);
    }

    #[test]
    fn test_parse_reset_requires_confirm_word() {
        assert_eq!(
            BotCommand::parse("/reset"),
            Some(BotCommand::Reset { confirmed: false })
        );
        assert_eq!(
            BotCommand::parse("/reset confirm"),
            Some(BotCommand::Reset { confirmed: true })
        );
        assert_eq!(
            BotCommand::parse("/reset CONFIRM"),
            Some(BotCommand::Reset { confirmed: true })
        );
    }

    #[test]
    fn test_parse_submit_aliases() {
        assert_eq!(BotCommand::parse("/submit"), Some(BotCommand::Submit));
        assert_eq!(BotCommand::parse("/now"), Some(BotCommand::Submit));
    }

    #[test]
    fn test_parse_strips_bot_mention() {
        assert_eq!(BotCommand::parse("/status@gform_bot"), Some(BotCommand::Status));
        assert_eq!(
            BotCommand::parse("/set@gform_bot temperature 36.5"),
            Some(BotCommand::Set(SetArgs {
                field: "temperature".to_owned(),
                value: "36.5".to_owned(),
            }))
        );
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(BotCommand::parse("/STATUS"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("/Submit"), Some(BotCommand::Submit));
    }

    #[test]
    fn test_parse_with_extra_whitespace() {
        assert_eq!(BotCommand::parse("  /status  "), Some(BotCommand::Status));
    }

    #[test]
    fn test_parse_non_command() {
        assert_eq!(BotCommand::parse("hello there"), None);
        assert_eq!(BotCommand::parse("/frobnicate"), None);
    }
}
