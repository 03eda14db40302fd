//! Registration-time errors
//!
//! These are programming defects in a suite definition. They surface when a
//! case is registered and are never retried or turned into test outcomes.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A case with the same suite and name is already registered
    DuplicateCase { test_id: String },
    /// A sequence was built with no steps
    EmptySequence,
    /// A step was appended after `then_succeed` / `then_fail`
    StepAfterTerminal { index: usize },
    /// `then_execute_for` with a zero-tick window
    ZeroDuration { index: usize },
    /// A config setter received a value outside its domain
    InvalidSetting { field: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateCase { test_id } => {
                write!(f, "test case '{}' is already registered", test_id)
            }
            ConfigError::EmptySequence => write!(f, "sequence has no steps"),
            ConfigError::StepAfterTerminal { index } => {
                write!(f, "step #{} follows a terminal step", index + 1)
            }
            ConfigError::ZeroDuration { index } => {
                write!(f, "step #{} has a zero-tick execute window", index + 1)
            }
            ConfigError::InvalidSetting { field, value } => {
                write!(f, "invalid value for {}: {}", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
