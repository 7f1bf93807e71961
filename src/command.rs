//! Request parsing: one text line in, one [`Command`] out

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("'{0}' is not a command")]
    UnknownCommand(String),
    #[error("wrong arguments for {0}")]
    BadArguments(&'static str),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Set(String, String),
    Get(String),
    Del(String),
    Exists(String),
    Expire(String, Duration),
    Incr(String),
    Decr(String),
    Clear,
    Save,
    Load,
}

/// Split a line into whitespace-separated words, verb first.
///
/// EXPIRE is the only verb whose argument may itself span several words,
/// since humantime durations are written like `1h 27m 13s`.
impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        if words.is_empty() {
            return Err(ParseError::Empty);
        }

        use Command::*;
        match words[0] {
            "SET" => match words.as_slice() {
                [_, key, value] => Ok(Set(key.to_string(), value.to_string())),
                _ => Err(ParseError::BadArguments("SET")),
            },
            "GET" => match words.as_slice() {
                [_, key] => Ok(Get(key.to_string())),
                _ => Err(ParseError::BadArguments("GET")),
            },
            "DEL" => match words.as_slice() {
                [_, key] => Ok(Del(key.to_string())),
                _ => Err(ParseError::BadArguments("DEL")),
            },
            "EXISTS" => match words.as_slice() {
                [_, key] => Ok(Exists(key.to_string())),
                _ => Err(ParseError::BadArguments("EXISTS")),
            },
            "EXPIRE" => match words.as_slice() {
                [_, key, duration @ ..] if !duration.is_empty() => {
                    let duration = duration
                        .join(" ")
                        .parse::<humantime::Duration>()
                        .map_err(|_| ParseError::BadArguments("EXPIRE"))?;
                    Ok(Expire(key.to_string(), duration.into()))
                }
                _ => Err(ParseError::BadArguments("EXPIRE")),
            },
            "INCR" => match words.as_slice() {
                [_, key] => Ok(Incr(key.to_string())),
                _ => Err(ParseError::BadArguments("INCR")),
            },
            "DECR" => match words.as_slice() {
                [_, key] => Ok(Decr(key.to_string())),
                _ => Err(ParseError::BadArguments("DECR")),
            },
            "CLEAR" => Ok(Clear),
            "SAVE" => Ok(Save),
            "LOAD" => Ok(Load),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}
