//! Uniform success/error envelope for every operation.
//!
//! Each operation resolves to exactly one of `Ok(payload)` or
//! `Err(OutcomeError)`. Composition uses the ordinary `Result` combinators
//! (`map`, `and_then`, `?`), which stop at the first failure.

use std::fmt;

/// Message used when an underlying error has no description.
pub const FALLBACK_MESSAGE: &str = "Unknown error";

/// Failure half of an [`Outcome`]: a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeError {
    message: String,
}

impl OutcomeError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self {
                message: FALLBACK_MESSAGE.to_string(),
            }
        } else {
            Self { message }
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for OutcomeError {}

/// Result of one operation.
pub type Outcome<T> = Result<T, OutcomeError>;

/// Normalize any fallible result into an [`Outcome`].
pub trait IntoOutcome<T> {
    fn into_outcome(self) -> Outcome<T>;
}

impl<T, E: fmt::Display> IntoOutcome<T> for Result<T, E> {
    fn into_outcome(self) -> Outcome<T> {
        self.map_err(|e| OutcomeError::new(e.to_string()))
    }
}
