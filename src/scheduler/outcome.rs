//! Terminal result of one attempt

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::AssertionError;

/// Result of one attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Pending,
    Success {
        tick: u64,
    },
    Failure {
        tick: u64,
        error: AssertionError,
    },
    /// `max_ticks` reached with nothing resolved
    Timeout {
        tick: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_pending: Option<String>,
    },
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Failure and Timeout count the same for pass/fail purposes
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. } | Outcome::Timeout { .. })
    }

    /// Active tick the outcome was decided on
    pub fn tick(&self) -> Option<u64> {
        match self {
            Outcome::Pending => None,
            Outcome::Success { tick } | Outcome::Failure { tick, .. } | Outcome::Timeout { tick, .. } => {
                Some(*tick)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pending => "PENDING",
            Outcome::Success { .. } => "PASS",
            Outcome::Failure { .. } => "FAIL",
            Outcome::Timeout { .. } => "TIMEOUT",
        }
    }

    /// One-line reason for a failed outcome
    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Failure { error, .. } => Some(error.to_string()),
            Outcome::Timeout { tick, last_pending } => Some(match last_pending {
                Some(reason) => format!("timed out at tick {} waiting on: {}", tick, reason),
                None => format!("timed out at tick {}", tick),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tick() {
            Some(tick) => write!(f, "{} (tick {})", self.label(), tick),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// Holds an attempt's outcome; only the first terminal value sticks
#[derive(Debug, Clone, Default)]
pub struct OutcomeSlot {
    outcome: Outcome,
}

impl OutcomeSlot {
    /// Record `outcome` unless one is already set. Returns true if stored.
    pub fn record(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_terminal() || !outcome.is_terminal() {
            return false;
        }
        self.outcome = outcome;
        true
    }

    pub fn get(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_set(&self) -> bool {
        self.outcome.is_terminal()
    }

    pub fn into_inner(self) -> Outcome {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_keeps_first_terminal_outcome() {
        let mut slot = OutcomeSlot::default();
        assert!(!slot.is_set());
        assert!(slot.record(Outcome::Success { tick: 4 }));
        assert!(!slot.record(Outcome::Failure {
            tick: 5,
            error: AssertionError::new("late"),
        }));
        assert!(!slot.record(Outcome::Timeout {
            tick: 9,
            last_pending: None
        }));
        assert_eq!(slot.get(), &Outcome::Success { tick: 4 });
    }

    #[test]
    fn test_slot_ignores_pending() {
        let mut slot = OutcomeSlot::default();
        assert!(!slot.record(Outcome::Pending));
        assert!(!slot.is_set());
    }

    #[test]
    fn test_timeout_counts_as_failure() {
        let timeout = Outcome::Timeout {
            tick: 10,
            last_pending: Some("door closed".to_string()),
        };
        assert!(timeout.is_failure());
        assert_eq!(timeout.label(), "TIMEOUT");
        assert_eq!(
            timeout.reason().as_deref(),
            Some("timed out at tick 10 waiting on: door closed")
        );
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_string(&Outcome::Success { tick: 3 }).unwrap();
        assert_eq!(json, r#"{"status":"success","tick":3}"#);
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Outcome::Success { tick: 3 });
    }
}
