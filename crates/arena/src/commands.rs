//! Console commands.
//!
//! `pausebots` toggles the global pause, `stepbots [n]` lets paused scripts
//! run `n` more ticks, `stats` prints dispatch statistics and `quit` stops
//! the host.

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Toggle the pause on every scripted subscriber
    PauseBots,
    /// Let paused subscribers run this many more ticks
    StepBots(i32),
    /// Log dispatch statistics
    Stats,
    /// Shut the host down
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Invalid step count '{0}': expected a non-negative number")]
    InvalidStepCount(String),
    #[error("Too many arguments for '{0}'")]
    TooManyArguments(String),
}

impl ConsoleCommand {
    /// Parses one console line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(CommandError::TooManyArguments(name.to_string()));
        }

        let command = match name.to_ascii_lowercase().as_str() {
            "pausebots" => ConsoleCommand::PauseBots,
            "stepbots" => match arg {
                None => ConsoleCommand::StepBots(1),
                Some(count) => match count.parse::<i32>() {
                    Ok(n) if n >= 0 => ConsoleCommand::StepBots(n),
                    _ => return Err(CommandError::InvalidStepCount(count.to_string())),
                },
            },
            "stats" => ConsoleCommand::Stats,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => return Err(CommandError::Unknown(name.to_string())),
        };

        if arg.is_some() && !matches!(command, ConsoleCommand::StepBots(_)) {
            return Err(CommandError::TooManyArguments(name.to_string()));
        }
        Ok(Some(command))
    }

    /// Whether the command is a script debugging command.
    pub fn is_debug(self) -> bool {
        matches!(self, ConsoleCommand::PauseBots | ConsoleCommand::StepBots(_))
    }
}

impl FromStr for ConsoleCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)?.ok_or_else(|| CommandError::Unknown(String::new()))
    }
}
