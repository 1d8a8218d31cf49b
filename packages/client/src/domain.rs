//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// # Returns
///
/// `true` if retrying cannot help (e.g., InvalidConfig),
/// `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::InvalidConfig(_) | ClientError::ReconnectExhausted(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `/move <lat> <lng> [accuracy]`
    Move {
        lat: f64,
        lng: f64,
        accuracy: Option<f64>,
    },
    /// `/sos [message]`
    Sos { message: Option<String> },
    /// `/nearby`
    Nearby,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
}

pub const HELP_TEXT: &str = "\
Commands:
  /move <lat> <lng> [accuracy]  update your position
  /sos [message]                raise an emergency alert
  /nearby                       list users within the alert radius
  /help                         show this help
  /quit                         exit";

/// Parse a prompt line. The error is a message for the user.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "/move" => {
            let args: Vec<&str> = rest.split_whitespace().collect();
            if !(2..=3).contains(&args.len()) {
                return Err("usage: /move <lat> <lng> [accuracy]".to_string());
            }
            let number = |s: &str| {
                s.parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", s))
            };
            Ok(Command::Move {
                lat: number(args[0])?,
                lng: number(args[1])?,
                accuracy: args.get(2).map(|s| number(*s)).transpose()?,
            })
        }
        "/sos" => Ok(Command::Sos {
            message: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        "/nearby" => Ok(Command::Nearby),
        "/help" => Ok(Command::Help),
        "/quit" | "/exit" => Ok(Command::Quit),
        _ => Err(format!("unknown command '{}' (try /help)", head)),
    }
}
