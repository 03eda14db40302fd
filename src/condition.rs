//! Assertion and condition results
//!
//! Actions and setup closures return [`ActionResult`]; any error is a hard
//! failure. Conditions return [`CheckResult`], which separates "not yet"
//! ([`CheckError::Pending`]) from a genuine assertion failure
//! ([`CheckError::Failed`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error raised when an assertion does not hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionError {
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub actual: String,
    /// Active tick the failure was raised on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
}

impl AssertionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected: String::new(),
            actual: String::new(),
            tick: None,
        }
    }

    /// Failure with an expected/actual pair
    pub fn mismatch(
        message: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self {
            message: message.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            tick: None,
        }
    }

    /// Stamp the tick, keeping an earlier stamp if one exists
    pub fn at_tick(mut self, tick: u64) -> Self {
        self.tick.get_or_insert(tick);
        self
    }
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tick) = self.tick {
            write!(f, "[tick {}] ", tick)?;
        }
        write!(f, "{}", self.message)?;
        if !self.expected.is_empty() || !self.actual.is_empty() {
            write!(f, "\n    Expected: {}\n    Actual: {}", self.expected, self.actual)?;
        }
        Ok(())
    }
}

impl std::error::Error for AssertionError {}

/// Why a condition is not satisfied on this tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Not satisfied yet; the step keeps polling
    Pending(String),
    /// Hard failure; the sequence fails immediately
    Failed(AssertionError),
}

impl From<AssertionError> for CheckError {
    fn from(error: AssertionError) -> Self {
        CheckError::Failed(error)
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Pending(reason) => write!(f, "pending: {}", reason),
            CheckError::Failed(error) => write!(f, "{}", error),
        }
    }
}

pub type ActionResult = Result<(), AssertionError>;
pub type CheckResult = Result<(), CheckError>;

/// "Not yet" signal for a polled condition
pub fn pending(reason: impl Into<String>) -> CheckError {
    CheckError::Pending(reason.into())
}

/// Satisfied when `cond` holds, pending otherwise
pub fn ready_when(cond: bool, reason: impl Into<String>) -> CheckResult {
    if cond { Ok(()) } else { Err(pending(reason)) }
}

/// Hard assertion
pub fn ensure(cond: bool, message: impl Into<String>) -> ActionResult {
    if cond {
        Ok(())
    } else {
        Err(AssertionError::new(message))
    }
}

/// Hard equality assertion
pub fn ensure_eq<T: PartialEq + fmt::Debug>(what: &str, expected: T, actual: T) -> ActionResult {
    if expected == actual {
        Ok(())
    } else {
        Err(AssertionError::mismatch(
            format!("{} mismatch", what),
            format!("{:?}", expected),
            format!("{:?}", actual),
        ))
    }
}
