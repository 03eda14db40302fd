//! Test case catalog: registration, configuration and selection

pub mod case;
pub mod catalog;
pub mod rotation;

pub use case::{CaseBuilder, CaseConfig, TestCase, TestId};
pub use catalog::{CaseFilter, Registry, TestInstance};
pub use rotation::Rotation;
