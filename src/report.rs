//! Per-case and per-run results

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::registry::{Rotation, TestInstance};
use crate::scheduler::{AttemptRecord, Outcome};

/// Every attempt of one instance, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    /// Instance id (`suite:name`, or `suite:name@dir` when rotated)
    pub id: String,
    pub suite: String,
    pub name: String,
    pub rotation: Rotation,
    pub batch: String,
    pub required: bool,
    pub max_attempts: u32,
    pub attempts: Vec<AttemptRecord>,
}

impl CaseReport {
    pub fn for_instance<S>(instance: &TestInstance<'_, S>) -> Self {
        let case = instance.case;
        Self {
            id: instance.id(),
            suite: case.id().suite.clone(),
            name: case.id().name.clone(),
            rotation: instance.rotation,
            batch: case.config().batch.clone(),
            required: case.config().required,
            max_attempts: case.config().max_attempts,
            attempts: Vec::new(),
        }
    }

    /// Outcome of the last attempt
    pub fn final_outcome(&self) -> &Outcome {
        static PENDING: Outcome = Outcome::Pending;
        self.attempts.last().map(|a| &a.outcome).unwrap_or(&PENDING)
    }

    pub fn passed(&self) -> bool {
        self.final_outcome().is_success()
    }

    /// Failed, but `required = false`
    pub fn is_known_failure(&self) -> bool {
        !self.required && !self.passed()
    }

    /// Fails the overall run
    pub fn is_blocking(&self) -> bool {
        self.required && !self.passed()
    }

    /// Passed, but only after at least one failed attempt
    pub fn is_flaky(&self) -> bool {
        self.passed() && self.attempts.len() > 1
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_known_failure() {
            "KNOWN-FAIL"
        } else {
            self.final_outcome().label()
        }
    }

    /// e.g. `PASS (tick 12)` or `FAIL (tick 3) after 3 attempts`
    pub fn status_line(&self) -> String {
        let mut line = self.status_label().to_string();
        if let Some(tick) = self.final_outcome().tick() {
            line.push_str(&format!(" (tick {})", tick));
        }
        if self.attempts.len() > 1 {
            line.push_str(&format!(" after {} attempts", self.attempts.len()));
        }
        line
    }
}

/// Tally of final statuses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub known_failures: usize,
    pub flaky: usize,
}

/// One invocation of the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    /// RFC 3339
    pub started_at: String,
    pub finished_at: Option<String>,
    pub cases: Vec<CaseReport>,
}

impl RunSummary {
    pub fn begin() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            cases: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now().to_rfc3339());
    }

    /// False only when a required case did not end in success
    pub fn passed(&self) -> bool {
        !self.cases.iter().any(CaseReport::is_blocking)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for case in &self.cases {
            if case.is_flaky() {
                counts.flaky += 1;
            }
            if case.passed() {
                counts.passed += 1;
            } else if case.is_known_failure() {
                counts.known_failures += 1;
            } else if matches!(case.final_outcome(), Outcome::Timeout { .. }) {
                counts.timed_out += 1;
            } else {
                counts.failed += 1;
            }
        }
        counts
    }

    pub fn total_attempts(&self) -> usize {
        self.cases.iter().map(|c| c.attempts.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize run: {}", e))
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        fs::write(path, self.to_json()?)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }
}
