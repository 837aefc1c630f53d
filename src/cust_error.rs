//! This module contains all custom errors used in this library.

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ImportError {
    IoError(std::io::Error),
    InputMalformed,
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> ImportError {
        ImportError::IoError(e)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError(_) => write!(f, "Import: IoError"),
            Self::InputMalformed => write!(f, "Import: Input is malformed."),
        }
    }
}

impl Error for ImportError {}

#[derive(Debug)]
pub enum ProcessingError {
    InvalidParameter(String),
    /// The solution produced by the search did not certify against a fresh
    /// copy of the input. This marks a bug in the rules, not a user error.
    VerificationFailed,
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Self::VerificationFailed => write!(f, "Verification failed"),
        }
    }
}

impl Error for ProcessingError {}
