use crate::AppError;

use std::{panic::Location, str::FromStr};

use error_location::ErrorLocation;

/// Console usage, one command per line.
pub(crate) const HELP: &str = "\
Commands:
  start                   begin a new recording
  pause | resume          pause or continue the current recording
  stop                    finish and save the current recording
  discard                 throw the current recording away
  interrupt               simulate losing audio focus
  interrupt-end [resume]  end the interruption, optionally resuming
  background              save session state as if suspended
  status                  show the current session
  list                    list saved recordings
  rename <n> <name>       rename recording number n
  delete <n>              delete recording number n
  space                   show free space in the recordings directory
  help                    show this text
  quit                    stop any recording and exit";

/// Commands sent from the console handler to the main application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a new recording.
    Start,
    /// Pause the current recording.
    Pause,
    /// Resume a paused recording.
    Resume,
    /// Finalize the current recording.
    Stop,
    /// Delete the current recording without saving.
    Discard,
    /// Audio focus lost.
    Interrupt,
    /// Audio focus regained.
    InterruptEnd {
        /// Whether capture should continue.
        resume: bool,
    },
    /// Process is being backgrounded.
    Background,
    /// Print the session status.
    Status,
    /// Print the recordings catalog.
    List,
    /// Rename a catalog entry.
    Rename {
        /// Zero-based catalog index.
        index: usize,
        /// New display name.
        name: String,
    },
    /// Delete a catalog entry.
    Delete {
        /// Zero-based catalog index.
        index: usize,
    },
    /// Print free space.
    Space,
    /// Print usage.
    Help,
    /// Request application shutdown.
    Quit,
}

impl FromStr for AppCommand {
    type Err = AppError;

    /// Parses one console line. Catalog numbers are typed one-based, as `list` shows them.
    #[track_caller]
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let invalid = |reason: &str| AppError::InvalidCommand {
            input: line.to_string(),
            reason: reason.to_string(),
            location: ErrorLocation::from(Location::caller()),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "start" | "record" => AppCommand::Start,
            "pause" => AppCommand::Pause,
            "resume" => AppCommand::Resume,
            "stop" => AppCommand::Stop,
            "discard" => AppCommand::Discard,
            "interrupt" => AppCommand::Interrupt,
            "interrupt-end" => match rest {
                "" => AppCommand::InterruptEnd { resume: false },
                "resume" => AppCommand::InterruptEnd { resume: true },
                _ => return Err(invalid("expected `interrupt-end` or `interrupt-end resume`")),
            },
            "background" | "bg" => AppCommand::Background,
            "status" => AppCommand::Status,
            "list" | "ls" => AppCommand::List,
            "rename" => {
                let Some((number, name)) = rest.split_once(char::is_whitespace) else {
                    return Err(invalid("usage: rename <n> <name>"));
                };
                AppCommand::Rename {
                    index: parse_index(number).ok_or_else(|| invalid("n must be a number from `list`"))?,
                    name: name.trim().to_string(),
                }
            }
            "delete" | "rm" => AppCommand::Delete {
                index: parse_index(rest).ok_or_else(|| invalid("usage: delete <n>"))?,
            },
            "space" | "df" => AppCommand::Space,
            "help" | "?" => AppCommand::Help,
            "quit" | "exit" | "q" => AppCommand::Quit,
            "" => return Err(invalid("empty line")),
            _ => return Err(invalid("unknown command, try `help`")),
        };

        let takes_arguments = matches!(
            command,
            AppCommand::InterruptEnd { .. } | AppCommand::Rename { .. } | AppCommand::Delete { .. }
        );
        if !takes_arguments && !rest.is_empty() {
            return Err(invalid("unexpected arguments"));
        }

        Ok(command)
    }
}

fn parse_index(number: &str) -> Option<usize> {
    number.trim().parse::<usize>().ok()?.checked_sub(1)
}
