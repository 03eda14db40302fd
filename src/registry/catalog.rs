//! Registry of test cases
//!
//! Pure catalog: it stores cases and their configuration and hands filtered
//! views to a runner. Nothing here executes a case.

use std::collections::{BTreeMap, HashMap};

use crate::condition::ActionResult;
use crate::constants::TAG_DISABLED;
use crate::context::TestContext;
use crate::error::ConfigError;
use crate::host::Simulation;

use super::case::{CaseBuilder, TestCase, TestId, setup_action};
use super::rotation::Rotation;

/// Selection criteria for running a subset of the registry
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Keep cases carrying at least one of these tags (empty = any)
    pub tags: Vec<String>,
    pub batch: Option<String>,
    /// Substring matched against `suite:name`
    pub name_contains: Option<String>,
    /// Keep `suite:disabled` cases that were not selected by tag
    pub include_disabled: bool,
}

impl CaseFilter {
    pub fn matches<S>(&self, case: &TestCase<S>) -> bool {
        let tag_selected = self.tags.iter().any(|t| case.has_tag(t));
        if !self.tags.is_empty() && !tag_selected {
            return false;
        }
        let disabled_selected = self.tags.iter().any(|t| t == TAG_DISABLED);
        if case.has_tag(TAG_DISABLED) && !self.include_disabled && !disabled_selected {
            return false;
        }
        if let Some(batch) = &self.batch
            && case.config().batch != *batch
        {
            return false;
        }
        if let Some(fragment) = &self.name_contains
            && !case.id().to_string().contains(fragment.as_str())
        {
            return false;
        }
        true
    }
}

/// One runnable instantiation of a case
pub struct TestInstance<'r, S> {
    pub case: &'r TestCase<S>,
    pub rotation: Rotation,
}

impl<S> Clone for TestInstance<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for TestInstance<'_, S> {}

impl<S> TestInstance<'_, S> {
    /// `suite:name`, suffixed with `@rotation` for rotated cases
    pub fn id(&self) -> String {
        if self.case.config().rotate {
            format!("{}@{}", self.case.id(), self.rotation)
        } else {
            self.case.id().to_string()
        }
    }
}

/// Catalog of all registered cases, in registration order
pub struct Registry<S> {
    cases: Vec<TestCase<S>>,
    index: HashMap<TestId, usize>,
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self {
            cases: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<S: Simulation> Registry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start registering a case; see [`CaseBuilder`] for the setters
    pub fn register<F>(
        &mut self,
        suite: impl Into<String>,
        name: impl Into<String>,
        setup: F,
    ) -> CaseBuilder<'_, S>
    where
        F: Fn(&mut TestContext<'_, S>) -> ActionResult + Send + Sync + 'static,
    {
        let id = TestId::new(suite, name);
        CaseBuilder::new(self, id, setup_action(setup))
    }
}

impl<S> Registry<S> {
    pub(crate) fn insert(&mut self, case: TestCase<S>) -> Result<(), ConfigError> {
        if self.index.contains_key(case.id()) {
            return Err(ConfigError::DuplicateCase {
                test_id: case.id().to_string(),
            });
        }
        self.index.insert(case.id().clone(), self.cases.len());
        self.cases.push(case);
        Ok(())
    }

    pub fn contains(&self, id: &TestId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &TestId) -> Option<&TestCase<S>> {
        self.index.get(id).map(|&i| &self.cases[i])
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn cases(&self) -> &[TestCase<S>] {
        &self.cases
    }

    /// Cases carrying `tag`; with no tag, every case not tagged disabled
    pub fn list_cases(&self, tag: Option<&str>) -> Vec<&TestCase<S>> {
        let filter = CaseFilter {
            tags: tag.map(|t| vec![t.to_string()]).unwrap_or_default(),
            ..Default::default()
        };
        self.select(&filter)
    }

    pub fn select(&self, filter: &CaseFilter) -> Vec<&TestCase<S>> {
        self.cases.iter().filter(|c| filter.matches(c)).collect()
    }

    /// Selected cases expanded into one instance per rotation
    pub fn instances(&self, filter: &CaseFilter) -> Vec<TestInstance<'_, S>> {
        self.select(filter)
            .into_iter()
            .flat_map(|case| {
                case.rotations()
                    .iter()
                    .map(move |&rotation| TestInstance { case, rotation })
            })
            .collect()
    }

    /// Instances grouped by batch name (sorted)
    pub fn batches(&self, filter: &CaseFilter) -> BTreeMap<String, Vec<TestInstance<'_, S>>> {
        let mut batches: BTreeMap<String, Vec<TestInstance<'_, S>>> = BTreeMap::new();
        for instance in self.instances(filter) {
            batches
                .entry(instance.case.config().batch.clone())
                .or_default()
                .push(instance);
        }
        batches
    }

    pub fn suites(&self) -> Vec<&str> {
        let mut suites: Vec<&str> = self.cases.iter().map(|c| c.id().suite.as_str()).collect();
        suites.sort_unstable();
        suites.dedup();
        suites
    }
}
