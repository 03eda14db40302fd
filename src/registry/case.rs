//! Registered test cases and their configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::condition::{ActionResult, CheckResult};
use crate::constants::{DEFAULT_BATCH, DEFAULT_MAX_TICKS, MAX_PADDING, TAG_DEFAULT};
use crate::context::TestContext;
use crate::error::ConfigError;
use crate::host::Simulation;
use crate::sequence::{Action, Condition, Sequence, SequenceBuilder};

use super::catalog::Registry;
use super::rotation::Rotation;

/// Unique identity of a case: suite plus name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId {
    pub suite: String,
    pub name: String,
}

impl TestId {
    pub fn new(suite: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.suite, self.name)
    }
}

/// Per-case settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseConfig {
    /// Hard ceiling on active ticks per attempt
    pub max_ticks: u64,
    /// Host ticks between setup and active tick 0
    pub setup_ticks: u64,
    pub tags: BTreeSet<String>,
    /// When false, a final failure is recorded but does not fail the run
    pub required: bool,
    /// Independent attempts before a failure is final (>= 1)
    pub max_attempts: u32,
    pub batch: String,
    /// Isolation distance kept around the structure
    pub padding: u32,
    /// Run once per cardinal rotation
    pub rotate: bool,
    /// Structure fixture name; `suite:name` when unset
    pub structure_name: Option<String>,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            setup_ticks: 0,
            tags: BTreeSet::new(),
            required: true,
            max_attempts: 1,
            batch: DEFAULT_BATCH.to_string(),
            padding: 0,
            rotate: false,
            structure_name: None,
        }
    }
}

/// A registered scenario
pub struct TestCase<S> {
    id: TestId,
    config: CaseConfig,
    setup: Action<S>,
    sequences: Vec<Sequence<S>>,
    /// Checked once, when the attempt reaches `max_ticks`
    deadline_checks: Vec<Condition<S>>,
}

impl<S> TestCase<S> {
    pub fn id(&self) -> &TestId {
        &self.id
    }

    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    pub fn setup(&self) -> &Action<S> {
        &self.setup
    }

    pub fn sequences(&self) -> &[Sequence<S>] {
        &self.sequences
    }

    pub fn deadline_checks(&self) -> &[Condition<S>] {
        &self.deadline_checks
    }

    pub fn structure_name(&self) -> String {
        self.config
            .structure_name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Declared tags, or `suite:default` when none were declared
    pub fn effective_tags(&self) -> Vec<&str> {
        if self.config.tags.is_empty() {
            vec![TAG_DEFAULT]
        } else {
            self.config.tags.iter().map(String::as_str).collect()
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.effective_tags().contains(&tag)
    }

    /// Rotations this case is instantiated with
    pub fn rotations(&self) -> &'static [Rotation] {
        const UNROTATED: &[Rotation] = &[Rotation::North];
        if self.config.rotate {
            &Rotation::ALL
        } else {
            UNROTATED
        }
    }
}

/// Fluent configuration for a case being registered
///
/// Nothing reaches the registry until [`CaseBuilder::finish`] succeeds.
#[must_use = "call `finish()` to add the case to the registry"]
pub struct CaseBuilder<'r, S: Simulation> {
    registry: &'r mut Registry<S>,
    case: TestCase<S>,
    error: Option<ConfigError>,
}

impl<'r, S: Simulation> CaseBuilder<'r, S> {
    pub(crate) fn new(registry: &'r mut Registry<S>, id: TestId, setup: Action<S>) -> Self {
        let error = registry
            .contains(&id)
            .then(|| ConfigError::DuplicateCase {
                test_id: id.to_string(),
            });
        Self {
            registry,
            case: TestCase {
                id,
                config: CaseConfig::default(),
                setup,
                sequences: Vec::new(),
                deadline_checks: Vec::new(),
            },
            error,
        }
    }

    fn record(&mut self, error: ConfigError) {
        self.error.get_or_insert(error);
    }

    pub fn max_ticks(mut self, ticks: u64) -> Self {
        if ticks == 0 {
            self.record(ConfigError::InvalidSetting {
                field: "max_ticks",
                value: ticks.to_string(),
            });
        }
        self.case.config.max_ticks = ticks;
        self
    }

    pub fn setup_ticks(mut self, ticks: u64) -> Self {
        self.case.config.setup_ticks = ticks;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.case.config.tags.insert(tag.into());
        self
    }

    pub fn batch(mut self, batch: impl Into<String>) -> Self {
        let batch = batch.into();
        if batch.is_empty() {
            self.record(ConfigError::InvalidSetting {
                field: "batch",
                value: "\"\"".to_string(),
            });
        }
        self.case.config.batch = batch;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.case.config.required = required;
        self
    }

    pub fn structure_name(mut self, name: impl Into<String>) -> Self {
        self.case.config.structure_name = Some(name.into());
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        if padding > MAX_PADDING {
            self.record(ConfigError::InvalidSetting {
                field: "padding",
                value: padding.to_string(),
            });
        }
        self.case.config.padding = padding;
        self
    }

    pub fn rotate_test(mut self, rotate: bool) -> Self {
        self.case.config.rotate = rotate;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        if attempts == 0 {
            self.record(ConfigError::InvalidSetting {
                field: "max_attempts",
                value: attempts.to_string(),
            });
        }
        self.case.config.max_attempts = attempts;
        self
    }

    /// Add an independent sequence; all sequences race for the outcome
    pub fn start_sequence(mut self, sequence: SequenceBuilder<S>) -> Self {
        match sequence.build() {
            Ok(sequence) => self.case.sequences.push(sequence),
            Err(error) => self.record(error),
        }
        self
    }

    /// Succeed the first tick `condition` is satisfied
    pub fn succeed_when<F>(self, condition: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> CheckResult + Send + Sync + 'static,
    {
        self.start_sequence(SequenceBuilder::new().then_wait(condition).then_succeed())
    }

    /// Check `condition` once at `max_ticks`; satisfied means success
    pub fn succeed_if<F>(mut self, condition: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> CheckResult + Send + Sync + 'static,
    {
        self.case.deadline_checks.push(Arc::new(condition));
        self
    }

    /// Fail the first tick `condition` is satisfied
    pub fn fail_if<F>(self, condition: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> CheckResult + Send + Sync + 'static,
    {
        self.start_sequence(
            SequenceBuilder::new()
                .then_wait(condition)
                .then_fail("fail_if condition held"),
        )
    }

    /// Validate and insert the case
    pub fn finish(self) -> Result<TestId, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let id = self.case.id.clone();
        self.registry.insert(self.case)?;
        Ok(id)
    }
}

/// Wrap a setup closure
pub(crate) fn setup_action<S, F>(setup: F) -> Action<S>
where
    F: Fn(&mut TestContext<'_, S>) -> ActionResult + Send + Sync + 'static,
{
    Arc::new(setup)
}
