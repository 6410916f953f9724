//! Interactive simulator commands.

use std::str::FromStr;

use fingerbell_hardware::mock::PrintId;
use thiserror::Error;

/// One line typed at the simulator prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rest a print on the window.
    Place(PrintId),
    /// Rest an unreadable finger on the window.
    Smudge,
    /// Clear the window.
    Lift,
    /// Run this many scan cycles.
    Tick(u32),
    Enroll { id: i64, name: String },
    Delete(i64),
    Clear,
    Pair,
    Check,
    /// Replace the sensor with a blank unit.
    Swap,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseCommandError(String);

fn number<T: FromStr>(word: Option<&str>, what: &str) -> Result<T, ParseCommandError> {
    let word = word.ok_or_else(|| ParseCommandError(format!("missing {}", what)))?;
    word.parse()
        .map_err(|_| ParseCommandError(format!("invalid {}: {}", what, word)))
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ParseCommandError("empty command".to_string()));
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "place" => Command::Place(number(words.next(), "print")?),
            "smudge" => Command::Smudge,
            "lift" => Command::Lift,
            "tick" => match words.next() {
                None => Command::Tick(1),
                word => Command::Tick(number(word, "count")?),
            },
            "enroll" => {
                let id = number(words.next(), "id")?;
                let name = words.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(ParseCommandError("missing name".to_string()));
                }
                return Ok(Command::Enroll { id, name });
            }
            "delete" => Command::Delete(number(words.next(), "id")?),
            "clear" => Command::Clear,
            "pair" => Command::Pair,
            "check" => Command::Check,
            "swap" => Command::Swap,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseCommandError(format!("unknown command: {}", other))),
        };

        match words.next() {
            None => Ok(command),
            Some(extra) => Err(ParseCommandError(format!("unexpected argument: {}", extra))),
        }
    }
}

pub const HELP: &str = "\
commands:
  place <print>        rest a finger with the given print id on the sensor
  smudge               rest an unreadable finger on the sensor
  lift                 lift the finger
  tick [n]             run n scan cycles (default 1)
  enroll <id> <name>   enroll the next five presentations at slot id
  delete <id>          delete the template at slot id
  clear                delete every template
  pair                 pair with the attached sensor
  check                verify the sensor pairing
  swap                 replace the sensor with a blank unit
  status               print the current observations
  quit                 exit";
