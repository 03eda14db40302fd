//! Demo host world and the suites that exercise it

pub mod suites;
pub mod world;

pub use suites::register_demo_suites;
pub use world::demo_app;
