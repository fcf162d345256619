//! Crate-level error types.

use std::fmt;

use crate::form::RegistrationError;

/// Errors produced by the meetup crate.
#[derive(Debug)]
pub enum MeetupError {
    /// An element the page contract expects is not in the document.
    MissingElement(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML / JSON options parsing or serialization failure.
    OptionsParse(String),
    /// The registration call failed.
    Registration(RegistrationError),
    /// A browser API call threw.
    Js(String),
}

impl fmt::Display for MeetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingElement(selector) => {
                write!(f, "missing element: {selector}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Registration(e) => write!(f, "registration error: {e}"),
            Self::Js(msg) => write!(f, "browser error: {msg}"),
        }
    }
}

impl std::error::Error for MeetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Registration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MeetupError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<RegistrationError> for MeetupError {
    fn from(e: RegistrationError) -> Self {
        Self::Registration(e)
    }
}
