//! Framework-wide defaults

/// Ticks an attempt may stay active before it times out
pub const DEFAULT_MAX_TICKS: u64 = 100;

/// Batch used when a case does not name one
pub const DEFAULT_BATCH: &str = "default";

/// Tag carried by every case that declares no tags of its own
pub const TAG_DEFAULT: &str = "suite:default";

/// Cases carrying this tag are skipped unless explicitly selected
pub const TAG_DISABLED: &str = "suite:disabled";

/// Upper bound on attempts ticking at once inside one batch
pub const DEFAULT_MAX_CONCURRENT: usize = 50;

/// Instances placed on one grid row before wrapping
pub const DEFAULT_TESTS_PER_ROW: usize = 8;

/// Host-space footprint (x, y, z) reserved for one test structure
pub const DEFAULT_FOOTPRINT: [u32; 3] = [16, 16, 16];

/// Largest isolation padding a case may request, in host blocks
pub const MAX_PADDING: u32 = 4096;

/// Default run settings file (optional)
pub const RUN_SETTINGS_FILE: &str = "config/gametest.toml";
